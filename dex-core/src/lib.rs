pub mod error;

pub mod config;

pub mod logging;
pub use logging::Logger;

pub mod cache {
    pub mod lookup_cache;
    pub use lookup_cache::CachedLookup;
}

pub mod controller {
    pub mod actions;
    pub use actions::{Action, ScrollMetrics};

    pub mod scroll_trigger;
    pub use scroll_trigger::ScrollTrigger;

    pub mod orchestrator;
    pub use orchestrator::{SearchOrchestrator, TaskResult};

    pub mod event_loop;
    pub use event_loop::EventLoop;
}

pub mod lookup {
    pub mod schema;

    pub mod service;
    pub use service::LookupService;

    pub mod http;
    pub use http::HttpLookup;
}

pub mod model {
    pub mod catalog;
    pub use catalog::Catalog;

    pub mod filter_state;
    pub use filter_state::{Epoch, FilterState, Tag};

    pub mod search_state;
    pub use search_state::{ResultRecord, SearchPhase, SearchSnapshot};
}

pub mod operators {
    pub mod name_filter;

    pub mod tag_resolver;

    pub mod page_fetcher;
}

pub mod storage {
    pub mod preferences;
    pub use preferences::{FilePreferenceStore, MemoryPreferenceStore, PreferenceStore};
}

pub mod util {
    pub mod debounce;
}

pub use error::{AppError, LookupError, SearchError, StorageError};

pub use controller::SearchOrchestrator;
