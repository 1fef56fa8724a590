//! `src/cache/lookup_cache.rs`
//! ============================================================================
//! # Tag member-list memoization
//!
//! Every settled text change re-runs tag resolution for the same tag set, so
//! member lists are kept in a `moka` cache with a TTL. Detail records are
//! always fetched fresh. Failed lookups are never cached.

use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, trace};

use crate::config::CacheConfig;
use crate::error::LookupError;
use crate::lookup::service::LookupService;
use crate::model::filter_state::Tag;
use crate::model::search_state::ResultRecord;

#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStats {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    #[expect(clippy::cast_precision_loss, reason = "Expected precision loss")]
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.misses();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

/// Decorates a [`LookupService`] with a tag member-list cache.
pub struct CachedLookup<L> {
    inner: L,
    tags: Cache<Tag, Arc<Vec<String>>>,
    stats: CacheStats,
}

impl<L: LookupService> CachedLookup<L> {
    #[must_use]
    pub fn new(inner: L, config: &CacheConfig) -> Self {
        let tags = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.ttl)
            .build();

        Self {
            inner,
            tags,
            stats: CacheStats::default(),
        }
    }

    #[must_use]
    pub const fn stats(&self) -> &CacheStats {
        &self.stats
    }

}

impl<L> Drop for CachedLookup<L> {
    fn drop(&mut self) {
        info!(
            hits = self.stats.hits(),
            misses = self.stats.misses(),
            hit_rate = self.stats.hit_rate(),
            "Tag cache closed"
        );
    }
}

#[async_trait]
impl<L: LookupService> LookupService for CachedLookup<L> {
    async fn tag_members(&self, tag: &Tag) -> Result<Vec<String>, LookupError> {
        if let Some(members) = self.tags.get(tag).await {
            trace!(%tag, "Tag cache hit");
            self.stats.record_hit();
            return Ok(members.as_ref().clone());
        }

        self.stats.record_miss();
        let members = self.inner.tag_members(tag).await?;
        debug!(%tag, members = members.len(), "Caching tag member list");
        self.tags
            .insert(tag.clone(), Arc::new(members.clone()))
            .await;
        Ok(members)
    }

    async fn record(&self, name: &str) -> Result<ResultRecord, LookupError> {
        self.inner.record(name).await
    }
}
