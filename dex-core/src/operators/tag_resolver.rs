//! Tag intersection resolution.
//!
//! Fetches the member list of every selected tag concurrently and keeps the
//! names present in all of them, in the order of the first tag's list.

use ahash::AHashSet;
use futures::future::try_join_all;
use std::time::Instant;
use tracing::{debug, instrument};

use crate::error::SearchError;
use crate::lookup::service::LookupService;
use crate::model::filter_state::Tag;

/// Resolves `tags` to the ordered intersection of their member lists.
///
/// Returns an empty list for an empty tag set; callers use the full catalog
/// in that case. Fails as a whole on the first failing tag.
#[instrument(level = "debug", skip(lookup, tags), fields(tags = tags.len()))]
pub async fn resolve_tags<L>(lookup: &L, tags: &[Tag]) -> Result<Vec<String>, SearchError>
where
    L: LookupService + ?Sized,
{
    if tags.is_empty() {
        return Ok(Vec::new());
    }

    let start = Instant::now();
    let lists = try_join_all(tags.iter().map(|tag| async move {
        lookup
            .tag_members(tag)
            .await
            .map_err(|source| SearchError::TagFetch {
                tag: tag.clone(),
                source,
            })
    }))
    .await?;

    let names = intersect(&lists);
    debug!(
        matches = names.len(),
        exec_ms = start.elapsed().as_millis() as u64,
        "Tag intersection resolved"
    );
    Ok(names)
}

/// Names common to every list, ordered (and deduplicated) as in the first.
#[must_use]
pub fn intersect(lists: &[Vec<String>]) -> Vec<String> {
    let Some((first, rest)) = lists.split_first() else {
        return Vec::new();
    };
    if rest.iter().any(Vec::is_empty) {
        return Vec::new();
    }

    let others: Vec<AHashSet<&str>> = rest
        .iter()
        .map(|list| list.iter().map(String::as_str).collect())
        .collect();

    let mut emitted = AHashSet::new();
    first
        .iter()
        .filter(|name| others.iter().all(|set| set.contains(name.as_str())))
        .filter(|name| emitted.insert(name.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LookupError;
    use crate::lookup::service::InMemoryLookup;
    use proptest::prelude::*;
    use std::time::Duration;

    fn tags(list: &[&str]) -> Vec<Tag> {
        list.iter().map(|t| Tag::from(*t)).collect()
    }

    #[tokio::test]
    async fn test_fire_and_flying() {
        let lookup = InMemoryLookup::new()
            .with_tag("fire", ["charmander", "charizard"])
            .with_tag("flying", ["charizard", "pidgey"]);

        let names = resolve_tags(&lookup, &tags(&["fire", "flying"])).await.unwrap();
        assert_eq!(names, vec!["charizard"]);
    }

    #[tokio::test]
    async fn test_order_follows_first_tag() {
        let lookup = InMemoryLookup::new()
            .with_tag("a", ["x", "y", "z"])
            .with_tag("b", ["z", "y", "x"]);

        let names = resolve_tags(&lookup, &tags(&["b", "a"])).await.unwrap();
        assert_eq!(names, vec!["z", "y", "x"]);
    }

    #[tokio::test]
    async fn test_empty_tag_set_is_noop() {
        let lookup = InMemoryLookup::new();
        let names = resolve_tags(&lookup, &[]).await.unwrap();
        assert!(names.is_empty());
        assert_eq!(lookup.tag_calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_member_list_is_not_an_error() {
        let lookup = InMemoryLookup::new()
            .with_tag("fire", ["charmander"])
            .with_tag("shadow", Vec::<String>::new());

        let names = resolve_tags(&lookup, &tags(&["fire", "shadow"])).await.unwrap();
        assert!(names.is_empty());
    }

    #[tokio::test]
    async fn test_single_failure_fails_resolution() {
        let lookup = InMemoryLookup::new()
            .with_tag("fire", ["charmander"])
            .with_tag("water", ["squirtle"]);
        lookup.fail("tag:water");

        let err = resolve_tags(&lookup, &tags(&["fire", "water"])).await.unwrap_err();
        match err {
            SearchError::TagFetch { tag, source } => {
                assert_eq!(tag.as_str(), "water");
                assert!(matches!(source, LookupError::Status { status: 500, .. }));
            }
            other => panic!("Expected TagFetch, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_tags_are_fetched_concurrently() {
        let lookup = InMemoryLookup::new()
            .with_tag("a", ["x"])
            .with_tag("b", ["x"])
            .with_tag("c", ["x"])
            .with_latency(Duration::from_millis(100));

        let start = tokio::time::Instant::now();
        resolve_tags(&lookup, &tags(&["a", "b", "c"])).await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(150));
    }

    proptest! {
        #[test]
        fn prop_intersection_is_exact(
            lists in proptest::collection::vec(
                proptest::collection::vec("[a-f]", 0..8), 1..4),
        ) {
            let out = intersect(&lists);

            for name in &out {
                prop_assert!(lists.iter().all(|l| l.contains(name)));
            }
            for name in &lists[0] {
                if lists.iter().all(|l| l.contains(name)) {
                    prop_assert!(out.contains(name));
                }
            }
            if lists.iter().any(Vec::is_empty) {
                prop_assert!(out.is_empty());
            }
        }
    }
}
