//! Static catalog of entity names.
//!
//! Loaded once at startup and never mutated afterwards. The process-wide
//! instance lives in a `OnceCell`; components receive it as an `Arc` so
//! tests can build their own.

use ahash::AHashSet;
use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::AppError;

const BUNDLED_CATALOG: &str = include_str!("../../assets/catalog.json");

static GLOBAL_CATALOG: OnceCell<Arc<Catalog>> = OnceCell::new();

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    name: String,
}

/// Accepted on-disk shapes: the lookup service's listing or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    Listing { results: Vec<CatalogEntry> },
    Names(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    names: Arc<[String]>,
}

impl Catalog {
    /// Builds a catalog, dropping repeated names (first occurrence wins).
    #[must_use]
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = AHashSet::new();
        let names: Vec<String> = names
            .into_iter()
            .map(Into::into)
            .filter(|name| seen.insert(name.clone()))
            .collect();

        Self {
            names: names.into(),
        }
    }

    pub fn from_json(text: &str) -> Result<Self, AppError> {
        let parsed: CatalogFile = serde_json::from_str(text)?;
        let catalog = match parsed {
            CatalogFile::Listing { results } => Self::new(results.into_iter().map(|e| e.name)),
            CatalogFile::Names(names) => Self::new(names),
        };

        debug!(entries = catalog.len(), "Parsed catalog");
        Ok(catalog)
    }

    pub async fn load(path: &Path) -> Result<Self, AppError> {
        info!("Loading catalog from {}", path.display());
        let text = tokio::fs::read_to_string(path).await?;
        Self::from_json(&text)
    }

    /// Catalog compiled into the binary.
    pub fn bundled() -> Result<Self, AppError> {
        Self::from_json(BUNDLED_CATALOG)
    }

    /// Sets the process-wide catalog. Only the first call succeeds.
    pub fn install(catalog: Self) -> Result<Arc<Self>, AppError> {
        let catalog = Arc::new(catalog);
        GLOBAL_CATALOG
            .set(Arc::clone(&catalog))
            .map_err(|_| AppError::Catalog("catalog already installed".into()))?;
        info!(entries = catalog.len(), "Catalog installed");
        Ok(catalog)
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
