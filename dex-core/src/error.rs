//! src/error.rs
//! ============================================================================
//! # Error types for the catalog search engine
//!
//! `SearchError` is what a failed epoch surfaces to the presentation layer.
//! `LookupError` describes a single failed call to the remote lookup service,
//! `StorageError` a failed preference read/write (never fatal). `AppError`
//! covers configuration, catalog and client bootstrap.

use std::{io, path::PathBuf};
use thiserror::Error;

use crate::model::filter_state::Tag;

/// Failure of one call against the remote lookup service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    /// Service answered with a non-success status.
    #[error("HTTP error! status: {status} ({url})")]
    Status { status: u16, url: String },

    /// Connection, DNS, timeout or body read failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Body did not match the expected response schema.
    #[error("unexpected response shape: {0}")]
    Schema(String),

    /// Requested key is unknown to the service.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Error that aborts the pipeline of the current epoch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SearchError {
    /// A tag member-list fetch failed.
    #[error("Failed to fetch tag {tag}: {source}")]
    TagFetch {
        tag: Tag,
        #[source]
        source: LookupError,
    },

    /// A per-name detail fetch failed.
    #[error("Failed to fetch {name}: {source}")]
    NameFetch {
        name: String,
        #[source]
        source: LookupError,
    },
}

impl SearchError {
    /// Heading of the replacement error view.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        "Failed to load data"
    }

    /// Body of the replacement error view.
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Name of the unit of work that failed.
    #[must_use]
    pub fn failed_key(&self) -> &str {
        match self {
            Self::TagFetch { tag, .. } => tag.as_str(),
            Self::NameFetch { name, .. } => name,
        }
    }
}

/// Preference store failure. Logged and ignored by the orchestrator.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("preference file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize preferences: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("corrupt preference value for '{key}': {reason}")]
    Corrupt { key: String, reason: String },

    #[error("preference writer for {path:?} has stopped")]
    WriterClosed { path: PathBuf },
}

/// Unified error type for the application shell.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {field} - {message}")]
    InvalidConfig { field: String, message: String },

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_fetch_identifies_name() {
        let err = SearchError::NameFetch {
            name: "pikachu".into(),
            source: LookupError::Status {
                status: 404,
                url: "http://x/name/pikachu".into(),
            },
        };

        assert_eq!(err.failed_key(), "pikachu");
        assert_eq!(err.title(), "Failed to load data");
        assert!(err.message().contains("pikachu"));
        assert!(err.message().contains("404"));
    }

    #[test]
    fn test_tag_fetch_message() {
        let err = SearchError::TagFetch {
            tag: Tag::from("fire"),
            source: LookupError::Transport("connection reset".into()),
        };

        assert_eq!(err.failed_key(), "fire");
        assert_eq!(
            err.message(),
            "Failed to fetch tag fire: transport error: connection reset"
        );
    }
}
