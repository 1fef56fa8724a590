//! Boundary to the remote lookup service.
//!
//! The engine only needs two calls: the member list of a tag and the detail
//! record of a name. [`InMemoryLookup`] serves both from memory, with
//! configurable latency and failures, and backs the test-suite.

use ahash::{AHashMap, AHashSet};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::LookupError;
use crate::model::filter_state::Tag;
use crate::model::search_state::ResultRecord;

#[async_trait]
pub trait LookupService: Send + Sync {
    /// Ordered member names of `tag`.
    async fn tag_members(&self, tag: &Tag) -> Result<Vec<String>, LookupError>;

    /// Detail record of `name`.
    async fn record(&self, name: &str) -> Result<ResultRecord, LookupError>;
}

#[async_trait]
impl<L: LookupService + ?Sized> LookupService for Arc<L> {
    async fn tag_members(&self, tag: &Tag) -> Result<Vec<String>, LookupError> {
        (**self).tag_members(tag).await
    }

    async fn record(&self, name: &str) -> Result<ResultRecord, LookupError> {
        (**self).record(name).await
    }
}

#[derive(Default)]
struct Script {
    default_delay: Duration,
    delays: AHashMap<String, Duration>,
    failing: AHashSet<String>,
}

/// Lookup service held entirely in memory.
///
/// Delays and failures are keyed by name, or by `tag:<tag>` for tag lookups.
#[derive(Default)]
pub struct InMemoryLookup {
    tags: AHashMap<Tag, Vec<String>>,
    records: AHashMap<String, ResultRecord>,
    script: RwLock<Script>,
    tag_calls: AtomicUsize,
    record_calls: AtomicUsize,
}

impl InMemoryLookup {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a record for every name, ids counting from 1.
    #[must_use]
    pub fn with_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for (idx, name) in names.into_iter().enumerate() {
            let name: String = name.into();
            let id = idx as u64 + 1;
            self.records.insert(
                name.clone(),
                ResultRecord {
                    name,
                    id,
                    image_url: Some(format!("https://img.example/{id}.png")),
                },
            );
        }
        self
    }

    #[must_use]
    pub fn with_record(mut self, record: ResultRecord) -> Self {
        self.records.insert(record.name.clone(), record);
        self
    }

    #[must_use]
    pub fn with_tag<I, S>(mut self, tag: &str, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags
            .insert(Tag::from(tag), members.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_latency(self, delay: Duration) -> Self {
        self.script.write().default_delay = delay;
        self
    }

    /// Latency for one key (`name` or `tag:<tag>`).
    pub fn set_delay(&self, key: &str, delay: Duration) {
        self.script.write().delays.insert(key.to_owned(), delay);
    }

    /// Makes every lookup of `key` fail with a 500.
    pub fn fail(&self, key: &str) {
        self.script.write().failing.insert(key.to_owned());
    }

    pub fn heal(&self, key: &str) {
        self.script.write().failing.remove(key);
    }

    #[must_use]
    pub fn tag_calls(&self) -> usize {
        self.tag_calls.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn record_calls(&self) -> usize {
        self.record_calls.load(Ordering::Relaxed)
    }

    async fn simulate(&self, key: &str) -> Result<(), LookupError> {
        let (delay, failing) = {
            let script = self.script.read();
            (
                script
                    .delays
                    .get(key)
                    .copied()
                    .unwrap_or(script.default_delay),
                script.failing.contains(key),
            )
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if failing {
            return Err(LookupError::Status {
                status: 500,
                url: format!("memory://{key}"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl LookupService for InMemoryLookup {
    async fn tag_members(&self, tag: &Tag) -> Result<Vec<String>, LookupError> {
        self.tag_calls.fetch_add(1, Ordering::Relaxed);
        self.simulate(&format!("tag:{tag}")).await?;

        self.tags
            .get(tag)
            .cloned()
            .ok_or_else(|| LookupError::NotFound(format!("tag {tag}")))
    }

    async fn record(&self, name: &str) -> Result<ResultRecord, LookupError> {
        self.record_calls.fetch_add(1, Ordering::Relaxed);
        self.simulate(name).await?;

        self.records
            .get(name)
            .cloned()
            .ok_or_else(|| LookupError::NotFound(format!("name {name}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_lookup_serves_records() {
        let lookup = InMemoryLookup::new()
            .with_names(["bulbasaur", "ivysaur"])
            .with_tag("grass", ["bulbasaur", "ivysaur"]);

        let record = lookup.record("ivysaur").await.unwrap();
        assert_eq!(record.id, 2);

        let members = lookup.tag_members(&Tag::from("grass")).await.unwrap();
        assert_eq!(members, vec!["bulbasaur", "ivysaur"]);
        assert_eq!(lookup.tag_calls(), 1);
        assert_eq!(lookup.record_calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_keys_and_failures() {
        let lookup = InMemoryLookup::new().with_names(["abra"]);

        assert!(matches!(
            lookup.record("kadabra").await,
            Err(LookupError::NotFound(_))
        ));
        assert!(matches!(
            lookup.tag_members(&Tag::from("psychic")).await,
            Err(LookupError::NotFound(_))
        ));

        lookup.fail("abra");
        assert!(matches!(
            lookup.record("abra").await,
            Err(LookupError::Status { status: 500, .. })
        ));
        lookup.heal("abra");
        assert!(lookup.record("abra").await.is_ok());
    }
}
