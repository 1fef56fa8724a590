//! ``src/controller/event_loop.rs``
//! ============================================================================
//! # Event loop: single owner of the search state
//!
//! Multiplexes background task results, settled (debounced) text, and user
//! actions onto one task, in that priority. The orchestrator is owned here and never shared, so
//! every transition runs to completion before the next event is looked at.
//! Observers read state through a `watch` channel of `SearchSnapshot`s.

use std::ops::ControlFlow;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::controller::actions::Action;
use crate::controller::orchestrator::{SearchOrchestrator, TaskResult};
use crate::model::search_state::SearchSnapshot;
use crate::util::debounce::{DebounceConfig, Debouncer};

/// Counters reported when the loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub actions: u64,
    pub settled_inputs: u64,
    pub tasks: u64,
    pub discarded: u64,
}

#[derive(Debug)]
enum LoopEvent {
    Action(Action),
    Settled(String),
    Task(TaskResult),
    Shutdown,
}

pub struct EventLoop {
    orchestrator: SearchOrchestrator,
    task_rx: mpsc::UnboundedReceiver<TaskResult>,
    action_rx: mpsc::UnboundedReceiver<Action>,
    debouncer: Debouncer<String>,
    settled_rx: mpsc::UnboundedReceiver<String>,
    snapshot_tx: watch::Sender<SearchSnapshot>,
    cancel: CancellationToken,
    stats: LoopStats,
}

impl EventLoop {
    pub fn new(
        orchestrator: SearchOrchestrator,
        task_rx: mpsc::UnboundedReceiver<TaskResult>,
        action_rx: mpsc::UnboundedReceiver<Action>,
        debounce: DebounceConfig,
    ) -> (Self, watch::Receiver<SearchSnapshot>) {
        let (debouncer, settled_rx) = Debouncer::new(debounce);
        let (snapshot_tx, snapshot_rx) = watch::channel(orchestrator.snapshot());

        info!(delay_ms = debounce.delay.as_millis() as u64, "Initializing event loop");
        let event_loop = Self {
            orchestrator,
            task_rx,
            action_rx,
            debouncer,
            settled_rx,
            snapshot_tx,
            cancel: CancellationToken::new(),
            stats: LoopStats::default(),
        };
        (event_loop, snapshot_rx)
    }

    /// Cancelling the token unmounts the search and ends `run`.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Mounts, processes events until quit or cancellation, then unmounts.
    pub async fn run(mut self) -> LoopStats {
        self.orchestrator.mount();
        self.publish();

        loop {
            let event = self.next_event().await;
            trace!("Event loop received: {:?}", event);

            let flow = match event {
                LoopEvent::Action(action) => self.handle_action(action),
                LoopEvent::Settled(text) => {
                    self.stats.settled_inputs += 1;
                    self.orchestrator.apply_text(&text);
                    ControlFlow::Continue(())
                }
                LoopEvent::Task(result) => {
                    self.stats.tasks += 1;
                    if !self.orchestrator.handle_task_result(result) {
                        self.stats.discarded += 1;
                    }
                    ControlFlow::Continue(())
                }
                LoopEvent::Shutdown => ControlFlow::Break(()),
            };

            if flow.is_break() {
                break;
            }
            self.publish();
        }

        self.debouncer.cancel();
        self.orchestrator.unmount();
        self.publish();
        self.orchestrator.flush_preferences().await;

        info!(
            actions = self.stats.actions,
            tasks = self.stats.tasks,
            discarded = self.stats.discarded,
            "Event loop terminated"
        );
        self.stats
    }

    async fn next_event(&mut self) -> LoopEvent {
        tokio::select! {
            biased;

            () = self.cancel.cancelled() => {
                info!("Shutdown requested");
                LoopEvent::Shutdown
            }

            // Finished work drains first so input cannot starve it.
            Some(result) = self.task_rx.recv() => LoopEvent::Task(result),

            Some(text) = self.settled_rx.recv() => LoopEvent::Settled(text),

            maybe_action = self.action_rx.recv() => match maybe_action {
                Some(action) => LoopEvent::Action(action),
                None => {
                    info!("Action channel closed");
                    LoopEvent::Shutdown
                }
            },
        }
    }

    fn handle_action(&mut self, action: Action) -> ControlFlow<()> {
        self.stats.actions += 1;
        debug!("Dispatching action: {:?}", action);

        match action {
            Action::TextInput(text) => {
                self.orchestrator.record_text_input(&text);
                self.debouncer.submit(text);
            }
            Action::ToggleTag(tag) => {
                self.orchestrator.toggle_tag(tag);
            }
            Action::ClearTags => {
                self.orchestrator.clear_tags();
            }
            Action::Scroll(metrics) => {
                self.orchestrator.on_scroll(metrics);
            }
            Action::LoadMore => {
                self.orchestrator.load_next_page();
            }
            Action::ScrollToTop => self.orchestrator.scroll_to_top(),
            Action::Retry => {
                self.orchestrator.retry();
            }
            Action::Quit => {
                info!("Quit action received");
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.orchestrator.snapshot());
    }
}
