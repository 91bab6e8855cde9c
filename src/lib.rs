//! Pagespeed-Harvest: a resumable PageSpeed Insights harvester
//!
//! This crate reads a site's sitemap, probes every URL for reachability and
//! content type, and drives the PageSpeed Insights API under a strict quota.
//! Progress lives in a per-session SQLite queue so an interrupted run can be
//! restarted without re-probing or re-fetching anything already known.

pub mod config;
pub mod crawler;
pub mod insights;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Pagespeed-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Transport error for {url}: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("Upstream returned HTTP {status} for {url}")]
    Upstream { url: String, status: u16 },

    #[error("Unsupported document at {url}: {message}")]
    Format { url: String, message: String },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Pagespeed-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::HarvestConfig;
pub use state::{ItemStatus, Strategy};
pub use storage::{QueueItem, QueueStore, SqliteQueueStore};
