//! src/config.rs
//! ============================================================================
//! # Config: search engine configuration loader and saver
//!
//! Loads and saves settings as TOML from the platform config path using the
//! [`directories`](https://docs.rs/directories) crate.
//!
//! ## Example
//! ```rust,ignore
//! let config = Config::load().await?;
//! config.save().await?;
//! ```

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use tokio::fs as TokioFs;

use crate::error::AppError;
use crate::logging::LoggerConfig;
use crate::lookup::schema::WireFormat;

const QUALIFIER: &str = "org";
const ORGANIZATION: &str = "dex";
const APPLICATION: &str = "dex";

/// Paging, debounce and scroll behaviour of the search screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Number of names fetched per page window.
    pub page_size: usize,

    /// Quiet period before a text change starts a search.
    #[serde(with = "humantime_serde")]
    pub debounce: Duration,

    /// Distance from the document bottom that triggers the next page.
    pub scroll_threshold_px: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            page_size: 12,
            debounce: Duration::from_millis(250),
            scroll_threshold_px: 100,
        }
    }
}

/// Remote lookup service endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,

    pub wire_format: WireFormat,

    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://pokeapi.co/api/v2".to_string(),
            wire_format: WireFormat::PokeApi,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Tag member-list cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,

    /// Maximum number of cached tags
    pub max_capacity: u64,

    /// Time-to-live for entries
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_capacity: 64,
            ttl: Duration::from_secs(1800), // 30 minutes
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Preference file; the platform data dir is used when unset.
    pub preferences_path: Option<PathBuf>,
}

/// Main configuration struct for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggerConfig,
}

impl Config {
    /// Loads config from the platform config dir, creating a default file if missing.
    pub async fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            Ok(Self::load_from(&path).await?)
        } else {
            info!(
                "No config file found at {}, using default configuration. Creating it now.",
                path.display()
            );

            let default_config = Self::default();
            default_config.save_to(&path).await?;

            Ok(default_config)
        }
    }

    /// Loads and validates config from an explicit path.
    pub async fn load_from(path: &Path) -> Result<Self, AppError> {
        info!("Loading config from {}", path.display());
        let text = TokioFs::read_to_string(path).await?;
        let cfg: Self = toml::from_str(&text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub async fn save(&self) -> anyhow::Result<()> {
        let path = Self::config_path()?;
        Ok(self.save_to(&path).await?)
    }

    pub async fn save_to(&self, path: &Path) -> Result<(), AppError> {
        info!("Saving config to {}", path.display());

        if let Some(parent) = path.parent() {
            TokioFs::create_dir_all(parent).await?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        TokioFs::write(path, toml_str).await?;

        Ok(())
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.search.page_size == 0 {
            return Err(AppError::InvalidConfig {
                field: "search.page_size".into(),
                message: "must be greater than 0".into(),
            });
        }

        if self.api.base_url.trim().is_empty() {
            return Err(AppError::InvalidConfig {
                field: "api.base_url".into(),
                message: "must not be empty".into(),
            });
        }

        if self.cache.enabled && self.cache.max_capacity == 0 {
            return Err(AppError::InvalidConfig {
                field: "cache.max_capacity".into(),
                message: "must be greater than 0 when the cache is enabled".into(),
            });
        }

        Ok(())
    }

    /// Preference file location: explicit override or the platform data dir.
    pub fn preferences_path(&self) -> anyhow::Result<PathBuf> {
        if let Some(path) = &self.storage.preferences_path {
            return Ok(path.clone());
        }
        Ok(Self::project_dirs()?
            .data_local_dir()
            .join(crate::storage::FilePreferenceStore::FILE_NAME))
    }

    /// Returns the canonical config file path using `directories::ProjectDirs`.
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn config_dir() -> anyhow::Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().to_path_buf())
    }

    fn project_dirs() -> anyhow::Result<ProjectDirs> {
        ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory."))
    }
}
