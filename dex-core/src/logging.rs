//! Tracing setup: JSON lines written through a non-blocking rolling file
//! appender, filtered by the configured level or `RUST_LOG`.

use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    str::FromStr,
    sync::atomic::{AtomicBool, Ordering},
};

use tracing::info;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    EnvFilter, Layer, filter::Directive, fmt::time::ChronoUtc, layer::SubscriberExt,
    util::SubscriberInitExt,
};

static INITIALIZED: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub log_dir: PathBuf,
    pub log_file_prefix: String,
    pub log_level: String,
    pub max_log_files: usize,
    pub rotation: LogRotation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Never,
    Daily,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("./logs"),
            log_file_prefix: "dex".to_string(),
            log_level: "info".to_string(),
            max_log_files: 10,
            rotation: LogRotation::Daily,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Logger already initialized")]
    AlreadyInitialized,

    #[error("Invalid log directory: {0}")]
    InvalidLogDirectory(String),

    #[error("Failed to create log directory: {0}")]
    DirectoryCreationFailed(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub struct Logger;

impl Logger {
    /// Installs the global subscriber. Keep the returned guard alive until
    /// exit, dropping it flushes buffered lines.
    pub fn init_tracing(config: &LoggerConfig) -> Result<WorkerGuard, LoggingError> {
        validate_config(config)?;

        if INITIALIZED.swap(true, Ordering::AcqRel) {
            return Err(LoggingError::AlreadyInitialized);
        }

        let result = Self::install(config);
        if result.is_err() {
            INITIALIZED.store(false, Ordering::Release);
        }
        result
    }

    fn install(config: &LoggerConfig) -> Result<WorkerGuard, LoggingError> {
        setup_log_directory(&config.log_dir)?;

        let rotation = match config.rotation {
            LogRotation::Never => Rotation::NEVER,
            LogRotation::Daily => Rotation::DAILY,
        };

        let file_appender = RollingFileAppender::builder()
            .rotation(rotation)
            .filename_prefix(config.log_file_prefix.as_str())
            .filename_suffix("jsonl")
            .max_log_files(config.max_log_files)
            .build(&config.log_dir)
            .map_err(|e| LoggingError::ConfigError(e.to_string()))?;

        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_target(true)
            .with_writer(non_blocking)
            .with_filter(make_filter(&config.log_level)?);

        tracing_subscriber::registry()
            .with(json_layer)
            .try_init()
            .map_err(|_| LoggingError::AlreadyInitialized)?;

        info!(
            log_dir = %config.log_dir.display(),
            level = %config.log_level,
            "Logging initialized"
        );
        Ok(guard)
    }
}

fn make_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    let directive = Directive::from_str(level)
        .map_err(|e| LoggingError::ConfigError(format!("Invalid log level '{level}': {e}")))?;
    Ok(EnvFilter::from_default_env().add_directive(directive))
}

fn validate_config(config: &LoggerConfig) -> Result<(), LoggingError> {
    if config.log_file_prefix.trim().is_empty() {
        return Err(LoggingError::ConfigError(
            "Log file prefix must not be empty".to_string(),
        ));
    }

    if config.max_log_files == 0 {
        return Err(LoggingError::ConfigError(
            "Max log files must be greater than 0".to_string(),
        ));
    }

    Directive::from_str(&config.log_level)
        .map_err(|e| LoggingError::ConfigError(format!("Invalid log level: {e}")))?;

    validate_log_directory(&config.log_dir)
}

fn validate_log_directory(path: &Path) -> Result<(), LoggingError> {
    if path.components().count() == 0 {
        return Err(LoggingError::InvalidLogDirectory("Empty path".to_string()));
    }

    if path.exists() && !path.is_dir() {
        return Err(LoggingError::InvalidLogDirectory(format!(
            "{} is not a directory",
            path.display()
        )));
    }

    Ok(())
}

fn setup_log_directory(log_dir: &Path) -> Result<(), LoggingError> {
    if !log_dir.exists() {
        std::fs::create_dir_all(log_dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&LoggerConfig::default()).is_ok());
    }

    #[test]
    fn test_rejects_bad_level_and_limits() {
        let config = LoggerConfig {
            log_level: "dex=loud".into(),
            ..LoggerConfig::default()
        };
        assert!(matches!(validate_config(&config), Err(LoggingError::ConfigError(_))));

        let config = LoggerConfig {
            max_log_files: 0,
            ..LoggerConfig::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_file_as_log_dir() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = LoggerConfig {
            log_dir: file.path().to_path_buf(),
            ..LoggerConfig::default()
        };
        assert!(matches!(
            validate_config(&config),
            Err(LoggingError::InvalidLogDirectory(_))
        ));
    }

    #[test]
    fn test_rejects_empty_dir() {
        assert!(validate_log_directory(Path::new("")).is_err());
    }
}
