//! Displayed search state and the read-only snapshot handed to presentation.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::SearchError;
use crate::model::filter_state::{Epoch, FilterState};

/// Detail record fetched for one name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub name: String,
    pub id: u64,
    pub image_url: Option<String>,
}

/// Orchestrator state machine phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchPhase {
    /// Before mount or after unmount.
    #[default]
    Idle,

    /// Resolving tags and filtering names for the current epoch.
    FilteringNames,

    /// A page window fetch is outstanding.
    FetchingPage,

    /// Last page fetch resolved.
    Settled,

    /// Pipeline of the current epoch failed.
    Error,
}

impl SearchPhase {
    #[must_use]
    pub const fn is_loading(self) -> bool {
        matches!(self, Self::FilteringNames | Self::FetchingPage)
    }
}

/// Window into the filtered name list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultPage {
    pub offset: usize,
    pub size: usize,
}

impl ResultPage {
    #[must_use]
    pub const fn new(offset: usize, size: usize) -> Self {
        Self { offset, size }
    }

    /// The following window of the same size.
    #[must_use]
    pub const fn next(self) -> Self {
        Self {
            offset: self.offset + self.size,
            size: self.size,
        }
    }

    /// `names.len() > offset + size`
    #[must_use]
    pub const fn has_more(self, total: usize) -> bool {
        total > self.offset + self.size
    }
}

/// What presentation consumes after every transition.
#[derive(Debug, Clone, Default)]
pub struct SearchSnapshot {
    pub epoch: Epoch,
    pub phase: SearchPhase,
    pub filter: FilterState,
    pub results: Arc<[ResultRecord]>,
    pub is_loading: bool,
    pub has_more: bool,
    pub error: Option<Arc<SearchError>>,
}

impl SearchSnapshot {
    #[must_use]
    pub fn result_names(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_more_boundary() {
        let page = ResultPage::new(0, 12);
        assert!(page.has_more(13));
        assert!(!page.has_more(12));
        assert!(!page.has_more(0));

        let third = page.next().next();
        assert_eq!(third.offset, 24);
        assert!(!third.has_more(30));
    }

    #[test]
    fn test_loading_phases() {
        assert!(SearchPhase::FilteringNames.is_loading());
        assert!(SearchPhase::FetchingPage.is_loading());
        assert!(!SearchPhase::Settled.is_loading());
        assert!(!SearchPhase::Error.is_loading());
        assert!(!SearchPhase::Idle.is_loading());
    }
}
