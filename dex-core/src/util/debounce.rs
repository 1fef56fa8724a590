//!  src/util/debounce.rs
//!  ===================================================================
//!  Trailing-edge debouncer for the search text.
//!
//!  • Every `submit` replaces the pending value and restarts the quiet
//!    period; the sleeper of the superseded value is aborted.
//!  • Emission happens on a `tokio::sync::mpsc` channel, so the event
//!    loop can `select!` on it next to its other sources.
//!  • A generation counter guarded by the same lock as the pending value
//!    guarantees that a superseded sleeper never emits, even if it already
//!    woke up when it was aborted.
//!  -------------------------------------------------------------------

use parking_lot::Mutex;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{Instant, sleep_until},
};
use tracing::{debug, trace};

/* ======================== DebounceConfig ============================ */

#[derive(Debug, Clone, Copy)]
pub struct DebounceConfig {
    pub delay: Duration,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self::search_input()
    }
}

impl DebounceConfig {
    /// Quiet period used for the search box.
    #[must_use]
    pub const fn search_input() -> Self {
        Self {
            delay: Duration::from_millis(250),
        }
    }

    #[must_use]
    pub const fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }
}

/* ============================ Debouncer ============================ */

struct Pending<T> {
    generation: u64,
    value: Option<T>,
}

pub struct Debouncer<T> {
    cfg: DebounceConfig,
    pending: Arc<Mutex<Pending<T>>>,
    sleeper: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<T>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Create a new debouncer and its Rx endpoint
    #[must_use]
    pub fn new(cfg: DebounceConfig) -> (Self, mpsc::UnboundedReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let deb = Self {
            cfg,
            pending: Arc::new(Mutex::new(Pending {
                generation: 0,
                value: None,
            })),
            sleeper: None,
            tx,
        };
        (deb, rx)
    }

    /// Submit a value; it is emitted once `delay` passes without another submit.
    pub fn submit(&mut self, value: T) {
        let generation = {
            let mut pending = self.pending.lock();
            pending.generation += 1;
            pending.value = Some(value);
            pending.generation
        };
        trace!(generation, "Debouncer received value");

        if let Some(handle) = self.sleeper.take() {
            handle.abort();
        }

        let deadline = Instant::now() + self.cfg.delay;
        let pending = Arc::clone(&self.pending);
        let tx = self.tx.clone();

        self.sleeper = Some(tokio::spawn(async move {
            sleep_until(deadline).await;

            let mut pending = pending.lock();
            if pending.generation != generation {
                return;
            }
            if let Some(value) = pending.value.take() {
                debug!(generation, "Debounce quiet period elapsed");
                let _ = tx.send(value);
            }
        }));
    }

    /// Drop the pending value without emitting it.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.sleeper.take() {
            handle.abort();
        }

        let mut pending = self.pending.lock();
        pending.generation += 1;
        pending.value = None;
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.sleeper.take() {
            handle.abort();
        }
    }
}
