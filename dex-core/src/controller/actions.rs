//! User and environment events fed into the event loop.

use crate::model::filter_state::Tag;

/// Viewport geometry reported by the scroll signal source, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollMetrics {
    pub viewport_height: u32,
    pub scroll_y: u32,
    pub document_height: u32,
}

impl ScrollMetrics {
    #[must_use]
    pub const fn new(viewport_height: u32, scroll_y: u32, document_height: u32) -> Self {
        Self {
            viewport_height,
            scroll_y,
            document_height,
        }
    }

    /// Pixels between the bottom of the viewport and the end of the document.
    #[must_use]
    pub const fn distance_to_bottom(&self) -> u32 {
        self.document_height
            .saturating_sub(self.viewport_height.saturating_add(self.scroll_y))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Raw keystroke-level text change (debounced before it filters).
    TextInput(String),

    /// Select or deselect a tag.
    ToggleTag(Tag),

    /// Deselect every tag.
    ClearTags,

    /// Viewport moved.
    Scroll(ScrollMetrics),

    /// Explicit "load more" request, gated like a scroll trigger.
    LoadMore,

    /// Top-of-page control was used.
    ScrollToTop,

    /// Re-run the current filter in a fresh epoch.
    Retry,

    Quit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_to_bottom() {
        assert_eq!(ScrollMetrics::new(800, 1000, 2000).distance_to_bottom(), 200);
        assert_eq!(ScrollMetrics::new(800, 1200, 2000).distance_to_bottom(), 0);
        assert_eq!(ScrollMetrics::new(800, 5000, 2000).distance_to_bottom(), 0);
    }
}
