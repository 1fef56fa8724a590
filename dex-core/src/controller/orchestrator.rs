//! ``src/controller/orchestrator.rs``
//! ============================================================================
//! # SearchOrchestrator: epoch-guarded search state machine
//!
//! ```text
//!   Idle ──mount──▶ FilteringNames ──names──▶ FetchingPage ──page──▶ Settled
//!                        │                        │  ▲                 │
//!                        └────────error───────────┴──┼──▶ Error        │
//!                                                    └──next page──────┘
//! ```
//!
//! Every filter change starts a new epoch. Background work is spawned with the
//! epoch it belongs to and reports back through a `TaskResult` channel; the
//! orchestrator applies a result only if its epoch is still current. Nothing
//! is aborted, stale work simply has no effect when it lands.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, instrument, trace, warn};

use crate::controller::actions::ScrollMetrics;
use crate::controller::scroll_trigger::ScrollTrigger;
use crate::error::SearchError;
use crate::lookup::service::LookupService;
use crate::model::catalog::Catalog;
use crate::model::filter_state::{Epoch, FilterState, Tag};
use crate::model::search_state::{ResultPage, ResultRecord, SearchPhase, SearchSnapshot};
use crate::operators::name_filter::filter_by_prefix;
use crate::operators::page_fetcher::fetch_page;
use crate::operators::tag_resolver::resolve_tags;
use crate::storage::preferences::{self, PreferenceStore};

/// Completion of a background step, tagged with the epoch it was issued under.
#[derive(Debug)]
pub enum TaskResult {
    NamesFiltered {
        epoch: Epoch,
        result: Result<Arc<[String]>, SearchError>,
        exec: Duration,
    },

    PageFetched {
        epoch: Epoch,
        page: ResultPage,
        result: Result<Vec<ResultRecord>, SearchError>,
        exec: Duration,
    },
}

impl TaskResult {
    #[must_use]
    pub const fn epoch(&self) -> Epoch {
        match self {
            Self::NamesFiltered { epoch, .. } | Self::PageFetched { epoch, .. } => *epoch,
        }
    }
}

/// Builds the filtered name list: tag intersection (if any) then prefix match.
pub async fn filter_names(
    catalog: &Catalog,
    lookup: &dyn LookupService,
    filter: &FilterState,
) -> Result<Vec<String>, SearchError> {
    let prefix = filter.prefix();
    if filter.has_tags() {
        let tags: Vec<Tag> = filter.tags.iter().cloned().collect();
        let members = resolve_tags(lookup, &tags).await?;
        Ok(filter_by_prefix(&members, &prefix))
    } else {
        Ok(filter_by_prefix(catalog.names(), &prefix))
    }
}

pub struct SearchOrchestrator {
    catalog: Arc<Catalog>,
    lookup: Arc<dyn LookupService>,
    prefs: Arc<dyn PreferenceStore>,
    page_size: usize,
    scroll: ScrollTrigger,

    filter: FilterState,
    epoch: Epoch,
    phase: SearchPhase,
    names: Arc<[String]>,
    page: ResultPage,
    results: Vec<ResultRecord>,
    has_more: bool,
    error: Option<Arc<SearchError>>,

    task_tx: UnboundedSender<TaskResult>,
}

impl SearchOrchestrator {
    /// Creates an unmounted orchestrator and the receiver for its task results.
    #[must_use]
    pub fn new(
        catalog: Arc<Catalog>,
        lookup: Arc<dyn LookupService>,
        prefs: Arc<dyn PreferenceStore>,
        page_size: usize,
        scroll: ScrollTrigger,
    ) -> (Self, UnboundedReceiver<TaskResult>) {
        let (task_tx, task_rx) = mpsc::unbounded_channel();
        let page_size = page_size.max(1);

        let orchestrator = Self {
            catalog,
            lookup,
            prefs,
            page_size,
            scroll,
            filter: FilterState::default(),
            epoch: Epoch::default(),
            phase: SearchPhase::Idle,
            names: Arc::from(Vec::new()),
            page: ResultPage::new(0, page_size),
            results: Vec::new(),
            has_more: false,
            error: None,
            task_tx,
        };
        (orchestrator, task_rx)
    }

    /* --------------------------- lifecycle ---------------------------- */

    /// Restores the filter from preferences and runs the first search.
    pub fn mount(&mut self) {
        self.filter = preferences::restore_filter(self.prefs.as_ref());
        info!(
            text = %self.filter.text,
            tags = self.filter.tags.len(),
            catalog = self.catalog.len(),
            "Mounting search"
        );
        self.start_epoch();
    }

    /// Drops all state; outstanding work of the last epoch will be discarded.
    pub fn unmount(&mut self) {
        info!(epoch = %self.epoch, "Unmounting search");
        self.epoch = self.epoch.next();
        self.reset_results();
        self.filter = FilterState::default();
        self.phase = SearchPhase::Idle;
    }

    /// Waits until every preference write issued so far has landed.
    pub async fn flush_preferences(&self) {
        self.prefs.flush().await;
    }

    /* ---------------------------- user input --------------------------- */

    /// Persists raw (undebounced) text. Does not start a search.
    pub fn record_text_input(&self, text: &str) {
        preferences::persist_text(self.prefs.as_ref(), text);
    }

    /// Applies a settled text value. Returns whether a new epoch started.
    pub fn apply_text(&mut self, text: &str) -> bool {
        if self.is_idle() || !self.filter.set_text(text) {
            return false;
        }
        debug!(text, "Search text settled");
        self.start_epoch();
        true
    }

    pub fn toggle_tag(&mut self, tag: Tag) -> bool {
        if self.is_idle() {
            return false;
        }
        let selected = self.filter.toggle_tag(tag.clone());
        debug!(%tag, selected, "Tag toggled");
        preferences::persist_tags(self.prefs.as_ref(), &self.filter);
        self.start_epoch();
        true
    }

    pub fn clear_tags(&mut self) -> bool {
        if self.is_idle() || !self.filter.clear_tags() {
            return false;
        }
        preferences::persist_tags(self.prefs.as_ref(), &self.filter);
        self.start_epoch();
        true
    }

    /// Re-runs the current filter from scratch.
    pub fn retry(&mut self) -> bool {
        if self.is_idle() {
            return false;
        }
        info!(epoch = %self.epoch, "Retrying search");
        self.start_epoch();
        true
    }

    /// Feeds a scroll position to the trigger; loads the next page on a hit.
    pub fn on_scroll(&mut self, metrics: ScrollMetrics) -> bool {
        let can_load = self.can_load_more();
        if self.scroll.observe(metrics, can_load) {
            return self.load_next_page();
        }
        false
    }

    pub const fn scroll_to_top(&mut self) {
        self.scroll.reset();
    }

    /// Advances one page within the current epoch if allowed.
    pub fn load_next_page(&mut self) -> bool {
        if !self.can_load_more() {
            trace!(phase = ?self.phase, has_more = self.has_more, "Next page not allowed");
            return false;
        }

        self.page = self.page.next();
        self.phase = SearchPhase::FetchingPage;
        debug!(epoch = %self.epoch, offset = self.page.offset, "Loading next page");
        self.spawn_page_fetch();
        true
    }

    /* ---------------------------- task results ------------------------- */

    /// Applies a finished background step. Returns false if it was discarded.
    #[instrument(level = "debug", skip_all, fields(epoch = %result.epoch(), current = %self.epoch))]
    pub fn handle_task_result(&mut self, result: TaskResult) -> bool {
        if result.epoch() != self.epoch {
            debug!("Discarding stale task result");
            return false;
        }

        match result {
            TaskResult::NamesFiltered { result, exec, .. } => {
                if self.phase != SearchPhase::FilteringNames {
                    warn!(phase = ?self.phase, "Unexpected name list, ignoring");
                    return false;
                }
                match result {
                    Ok(names) => {
                        debug!(
                            matches = names.len(),
                            exec_ms = exec.as_millis() as u64,
                            "Names filtered"
                        );
                        self.has_more = self.page.has_more(names.len());
                        self.names = names;
                        self.phase = SearchPhase::FetchingPage;
                        self.spawn_page_fetch();
                    }
                    Err(e) => self.fail(e),
                }
            }

            TaskResult::PageFetched {
                page, result, exec, ..
            } => {
                if self.phase != SearchPhase::FetchingPage || page != self.page {
                    warn!(offset = page.offset, phase = ?self.phase, "Unexpected page, ignoring");
                    return false;
                }
                match result {
                    Ok(records) => {
                        debug!(
                            offset = page.offset,
                            fetched = records.len(),
                            exec_ms = exec.as_millis() as u64,
                            "Page fetched"
                        );
                        if page.offset == 0 {
                            self.results = records;
                        } else {
                            self.results.extend(records);
                        }
                        self.has_more = page.has_more(self.names.len());
                        self.phase = SearchPhase::Settled;
                    }
                    Err(e) => self.fail(e),
                }
            }
        }
        true
    }

    /* ------------------------------ queries ---------------------------- */

    #[must_use]
    pub fn snapshot(&self) -> SearchSnapshot {
        SearchSnapshot {
            epoch: self.epoch,
            phase: self.phase,
            filter: self.filter.clone(),
            results: Arc::from(self.results.as_slice()),
            is_loading: self.phase.is_loading(),
            has_more: self.has_more,
            error: self.error.clone(),
        }
    }

    #[must_use]
    pub const fn can_load_more(&self) -> bool {
        matches!(self.phase, SearchPhase::Settled) && self.has_more
    }

    #[must_use]
    pub const fn epoch(&self) -> Epoch {
        self.epoch
    }

    #[must_use]
    pub const fn phase(&self) -> SearchPhase {
        self.phase
    }

    #[must_use]
    pub const fn filter(&self) -> &FilterState {
        &self.filter
    }

    #[must_use]
    pub fn results(&self) -> &[ResultRecord] {
        &self.results
    }

    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.has_more
    }

    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self.phase, SearchPhase::Idle)
    }

    /* ------------------------------ internals -------------------------- */

    fn reset_results(&mut self) {
        self.page = ResultPage::new(0, self.page_size);
        self.names = Arc::from(Vec::new());
        self.results.clear();
        self.has_more = false;
        self.error = None;
        self.scroll.reset();
    }

    fn start_epoch(&mut self) {
        self.epoch = self.epoch.next();
        self.reset_results();
        self.phase = SearchPhase::FilteringNames;
        info!(
            epoch = %self.epoch,
            text = %self.filter.text,
            tags = ?self.filter.tags,
            "Starting search epoch"
        );
        self.spawn_name_filter();
    }

    fn fail(&mut self, error: SearchError) {
        warn!(epoch = %self.epoch, "Search failed: {}", error);
        self.results.clear();
        self.has_more = false;
        self.error = Some(Arc::new(error));
        self.phase = SearchPhase::Error;
    }

    fn spawn_name_filter(&self) {
        let epoch = self.epoch;
        let filter = self.filter.clone();
        let catalog = Arc::clone(&self.catalog);
        let lookup = Arc::clone(&self.lookup);
        let task_tx = self.task_tx.clone();

        tokio::spawn(async move {
            let start_time = Instant::now();
            let result = filter_names(&catalog, lookup.as_ref(), &filter)
                .await
                .map(Arc::from);

            let task_result = TaskResult::NamesFiltered {
                epoch,
                result,
                exec: start_time.elapsed(),
            };
            if let Err(e) = task_tx.send(task_result) {
                trace!("Name filter result dropped, receiver gone: {}", e);
            }
        });
    }

    fn spawn_page_fetch(&self) {
        let epoch = self.epoch;
        let page = self.page;
        let names = Arc::clone(&self.names);
        let lookup = Arc::clone(&self.lookup);
        let task_tx = self.task_tx.clone();

        tokio::spawn(async move {
            let start_time = Instant::now();
            let result = fetch_page(lookup.as_ref(), &names, page).await;

            let task_result = TaskResult::PageFetched {
                epoch,
                page,
                result,
                exec: start_time.elapsed(),
            };
            if let Err(e) = task_tx.send(task_result) {
                trace!("Page result dropped, receiver gone: {}", e);
            }
        });
    }
}
