//! Preference persistence behind a minimal get/set string interface.
//!
//! The orchestrator stores the raw search text and the selected tags so a
//! new session starts where the last one stopped. Failures are reported as
//! [`StorageError`] and are never fatal to a search.

use ahash::AHashMap;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs as TokioFs;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace, warn};

use crate::error::StorageError;
use crate::model::filter_state::{FilterState, Tag};

pub const SEARCH_TERM_KEY: &str = "search_term";
pub const TAGS_KEY: &str = "tags";

/// Reads and writes never block on disk; `flush` waits for pending writes.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    async fn flush(&self) {}
}

/// Rebuilds the filter state; unreadable values fall back to defaults.
pub fn restore_filter(store: &dyn PreferenceStore) -> FilterState {
    let text = match store.get(SEARCH_TERM_KEY) {
        Ok(text) => text.unwrap_or_default(),
        Err(e) => {
            warn!("Failed to restore search term, using default: {}", e);
            String::new()
        }
    };

    let tags = match store.get(TAGS_KEY).and_then(|raw| raw.map(decode_tags).transpose()) {
        Ok(tags) => tags.unwrap_or_default(),
        Err(e) => {
            warn!("Failed to restore tags, using default: {}", e);
            Vec::new()
        }
    };

    debug!(text = %text, tags = tags.len(), "Restored filter state");
    FilterState::new(text, tags)
}

pub fn persist_text(store: &dyn PreferenceStore, text: &str) {
    if let Err(e) = store.set(SEARCH_TERM_KEY, text) {
        warn!("Failed to persist search term: {}", e);
    }
}

pub fn persist_tags(store: &dyn PreferenceStore, filter: &FilterState) {
    let tags: Vec<&Tag> = filter.tags.iter().collect();
    let result = serde_json::to_string(&tags)
        .map_err(StorageError::from)
        .and_then(|raw| store.set(TAGS_KEY, &raw));
    if let Err(e) = result {
        warn!("Failed to persist tags: {}", e);
    }
}

fn decode_tags(raw: String) -> Result<Vec<Tag>, StorageError> {
    serde_json::from_str(&raw).map_err(|e| StorageError::Corrupt {
        key: TAGS_KEY.to_owned(),
        reason: e.to_string(),
    })
}

/* ======================== MemoryPreferenceStore ======================== */

#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    values: Mutex<AHashMap<String, String>>,
}

impl MemoryPreferenceStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values.lock().insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/* ========================= FilePreferenceStore ========================= */

#[derive(Debug)]
enum WriteCommand {
    /// Full JSON snapshot of the map at the time of a `set`.
    Save(String),
    Flush(oneshot::Sender<()>),
}

/// JSON object on disk, read once at open.
///
/// `get` is served from memory. Every `set` queues a full snapshot to a
/// single writer task that replaces the file via temp file plus rename, so
/// writes land in mutation order and a failed write is repaired by the next
/// successful one.
#[derive(Debug)]
pub struct FilePreferenceStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
    writer: mpsc::UnboundedSender<WriteCommand>,
    failures: Arc<AtomicU64>,
}

impl FilePreferenceStore {
    pub const FILE_NAME: &'static str = "preferences.json";

    /// Opens the store and starts its writer task.
    ///
    /// A missing file starts empty, a corrupt one is an error.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let values = match TokioFs::read_to_string(&path).await {
            Ok(text) => serde_json::from_str(&text).map_err(|e| StorageError::Corrupt {
                key: path.display().to_string(),
                reason: e.to_string(),
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No preference file at {}, starting empty", path.display());
                BTreeMap::new()
            }
            Err(source) => return Err(StorageError::Io { path, source }),
        };

        let (writer, rx) = mpsc::unbounded_channel();
        let failures = Arc::new(AtomicU64::new(0));
        tokio::spawn(run_writer(path.clone(), rx, Arc::clone(&failures)));

        Ok(Self {
            path,
            values: Mutex::new(values),
            writer,
            failures,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes that failed since open.
    #[must_use]
    pub fn write_failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PreferenceStore for FilePreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        // Snapshot and enqueue under the lock so queue order is mutation order.
        let mut values = self.values.lock();
        values.insert(key.to_owned(), value.to_owned());
        let json = serde_json::to_string_pretty(&*values)?;
        self.writer
            .send(WriteCommand::Save(json))
            .map_err(|_| StorageError::WriterClosed {
                path: self.path.clone(),
            })
    }

    async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.writer.send(WriteCommand::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }
}

async fn run_writer(
    path: PathBuf,
    mut rx: mpsc::UnboundedReceiver<WriteCommand>,
    failures: Arc<AtomicU64>,
) {
    while let Some(command) = rx.recv().await {
        let mut json = match command {
            WriteCommand::Save(json) => json,
            WriteCommand::Flush(ack) => {
                let _ = ack.send(());
                continue;
            }
        };

        // A burst of keystrokes collapses into its newest snapshot.
        let mut acks = Vec::new();
        while let Ok(next) = rx.try_recv() {
            match next {
                WriteCommand::Save(newer) => json = newer,
                WriteCommand::Flush(ack) => {
                    acks.push(ack);
                    break;
                }
            }
        }

        match write_atomic(&path, &json).await {
            Ok(()) => trace!(path = %path.display(), "Preferences written"),
            Err(e) => {
                failures.fetch_add(1, Ordering::Relaxed);
                warn!("Failed to write preferences: {}", e);
            }
        }

        for ack in acks {
            let _ = ack.send(());
        }
    }
    debug!(path = %path.display(), "Preference writer stopped");
}

async fn write_atomic(path: &Path, json: &str) -> Result<(), StorageError> {
    let io_err = |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        TokioFs::create_dir_all(parent).await.map_err(io_err)?;
    }

    let temp_path = path.with_extension("json.tmp");
    let written = match TokioFs::write(&temp_path, json).await {
        Ok(()) => TokioFs::rename(&temp_path, path).await,
        Err(e) => Err(e),
    };

    if let Err(source) = written {
        if let Err(e) = TokioFs::remove_file(&temp_path).await {
            trace!("No temp file to remove: {}", e);
        }
        return Err(io_err(source));
    }
    Ok(())
}
