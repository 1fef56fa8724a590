//! User intent: the text prefix and the selected tags, plus the epoch token
//! that identifies one version of that intent.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque category identifier. Membership is resolved by the lookup service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Tag {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for Tag {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generation counter of the filter state.
///
/// Every asynchronous task captures the epoch it was issued under; a result
/// is only applied if its epoch still equals the orchestrator's current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Epoch(u64);

impl Epoch {
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current search intent.
///
/// Tags keep their selection order: the first selected tag decides the order
/// of the intersected member list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub text: String,
    pub tags: IndexSet<Tag>,
}

impl FilterState {
    #[must_use]
    pub fn new(text: impl Into<String>, tags: impl IntoIterator<Item = Tag>) -> Self {
        Self {
            text: text.into(),
            tags: tags.into_iter().collect(),
        }
    }

    /// Lowercased prefix used for matching.
    #[must_use]
    pub fn prefix(&self) -> String {
        self.text.to_lowercase()
    }

    /// Returns true when the text actually changed.
    pub fn set_text(&mut self, text: &str) -> bool {
        if self.text == text {
            return false;
        }
        self.text = text.to_owned();
        true
    }

    /// Adds an unselected tag at the end of the selection, removes a selected one.
    /// Returns whether the tag is selected afterwards.
    pub fn toggle_tag(&mut self, tag: Tag) -> bool {
        if self.tags.shift_remove(&tag) {
            false
        } else {
            self.tags.insert(tag);
            true
        }
    }

    /// Returns false when there was nothing to clear.
    pub fn clear_tags(&mut self) -> bool {
        if self.tags.is_empty() {
            return false;
        }
        self.tags.clear();
        true
    }

    #[must_use]
    pub fn has_tags(&self) -> bool {
        !self.tags.is_empty()
    }
}
