//! Page window fetches: one concurrent detail lookup per name in the window.

use futures::future::try_join_all;
use std::time::Instant;
use tracing::{debug, instrument};

use crate::error::SearchError;
use crate::lookup::service::LookupService;
use crate::model::search_state::{ResultPage, ResultRecord};

/// `names[offset..offset + size]`, clamped to the list.
#[must_use]
pub fn page_window(names: &[String], page: ResultPage) -> &[String] {
    let start = page.offset.min(names.len());
    let end = page.offset.saturating_add(page.size).min(names.len());
    &names[start..end]
}

/// Fetches the detail records of one page window, in list order.
///
/// The whole window fails if any name fails; the error names the culprit.
#[instrument(level = "debug", skip(lookup, names), fields(offset = page.offset, size = page.size))]
pub async fn fetch_page<L>(
    lookup: &L,
    names: &[String],
    page: ResultPage,
) -> Result<Vec<ResultRecord>, SearchError>
where
    L: LookupService + ?Sized,
{
    let window = page_window(names, page);
    if window.is_empty() {
        return Ok(Vec::new());
    }

    let start = Instant::now();
    let records = try_join_all(window.iter().map(|name| async move {
        lookup
            .record(name)
            .await
            .map_err(|source| SearchError::NameFetch {
                name: name.clone(),
                source,
            })
    }))
    .await?;

    debug!(
        fetched = records.len(),
        exec_ms = start.elapsed().as_millis() as u64,
        "Page window fetched"
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::service::InMemoryLookup;
    use std::time::Duration;

    fn numbered(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("mon-{i:02}")).collect()
    }

    #[test]
    fn test_window_clamping() {
        let names = numbered(30);
        assert_eq!(page_window(&names, ResultPage::new(0, 12)).len(), 12);
        assert_eq!(page_window(&names, ResultPage::new(24, 12)).len(), 6);
        assert!(page_window(&names, ResultPage::new(36, 12)).is_empty());
        assert!(page_window(&names, ResultPage::new(usize::MAX, 12)).is_empty());
    }

    #[tokio::test]
    async fn test_single_match_page() {
        let lookup = InMemoryLookup::new().with_names(["bulbasaur", "charmander", "squirtle"]);
        let names = vec!["charmander".to_string()];

        let records = fetch_page(&lookup, &names, ResultPage::new(0, 12)).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "charmander");
    }

    #[tokio::test]
    async fn test_pages_cover_list_without_gaps() {
        let names = numbered(30);
        let lookup = InMemoryLookup::new().with_names(names.clone());

        let mut collected = Vec::new();
        let mut page = ResultPage::new(0, 12);
        loop {
            let records = fetch_page(&lookup, &names, page).await.unwrap();
            collected.extend(records.into_iter().map(|r| r.name));
            if !page.has_more(names.len()) {
                break;
            }
            page = page.next();
        }

        assert_eq!(collected, names);
    }

    #[tokio::test(start_paused = true)]
    async fn test_order_kept_despite_uneven_latency() {
        let names = numbered(4);
        let lookup = InMemoryLookup::new().with_names(names.clone());
        lookup.set_delay("mon-00", Duration::from_millis(300));
        lookup.set_delay("mon-02", Duration::from_millis(100));

        let records = fetch_page(&lookup, &names, ResultPage::new(0, 12)).await.unwrap();
        let fetched: Vec<String> = records.into_iter().map(|r| r.name).collect();
        assert_eq!(fetched, names);
    }

    #[tokio::test]
    async fn test_failure_names_the_culprit() {
        let names = numbered(5);
        let lookup = InMemoryLookup::new().with_names(names.clone());
        lookup.fail("mon-03");

        let err = fetch_page(&lookup, &names, ResultPage::new(0, 12)).await.unwrap_err();
        assert!(matches!(&err, SearchError::NameFetch { name, .. } if name == "mon-03"));
    }

    #[tokio::test]
    async fn test_failure_outside_window_is_ignored() {
        let names = numbered(5);
        let lookup = InMemoryLookup::new().with_names(names.clone());
        lookup.fail("mon-04");

        let records = fetch_page(&lookup, &names, ResultPage::new(0, 3)).await.unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(lookup.record_calls(), 3);
    }
}
