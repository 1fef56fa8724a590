//! Scroll-driven pagination trigger.
//!
//! Fires when the viewport comes within `threshold_px` of the document
//! bottom, but only while the orchestrator can accept a page request. One
//! crossing fires at most once: after firing, the trigger stays quiet until
//! the viewport leaves the threshold zone or the document grows.

use tracing::trace;

use crate::controller::actions::ScrollMetrics;

#[derive(Debug, Clone)]
pub struct ScrollTrigger {
    threshold_px: u32,
    /// Document height at the last firing inside the current crossing.
    fired_at: Option<u32>,
}

impl ScrollTrigger {
    #[must_use]
    pub const fn new(threshold_px: u32) -> Self {
        Self {
            threshold_px,
            fired_at: None,
        }
    }

    /// Returns true when a "near bottom" signal should be sent.
    ///
    /// `can_load` is `hasMore && !isLoading` of the current epoch.
    pub fn observe(&mut self, metrics: ScrollMetrics, can_load: bool) -> bool {
        let near_bottom = metrics.distance_to_bottom() <= self.threshold_px;
        if !near_bottom {
            self.fired_at = None;
            return false;
        }

        if !can_load || self.fired_at == Some(metrics.document_height) {
            return false;
        }

        trace!(
            distance = metrics.distance_to_bottom(),
            document_height = metrics.document_height,
            "Near bottom"
        );
        self.fired_at = Some(metrics.document_height);
        true
    }

    /// Forget the last crossing (new epoch or scroll-to-top).
    pub const fn reset(&mut self) {
        self.fired_at = None;
    }

    #[must_use]
    pub const fn threshold_px(&self) -> u32 {
        self.threshold_px
    }
}

impl Default for ScrollTrigger {
    fn default() -> Self {
        Self::new(100)
    }
}
