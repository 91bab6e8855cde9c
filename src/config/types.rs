use crate::crawler::AdmissionConfig;
use crate::insights::{Category, DEFAULT_ENDPOINT};
use crate::state::Strategy;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Pagespeed-Harvest
///
/// Every section has defaults, so an empty TOML file is valid apart from the
/// API key, which usually arrives from the command line.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub classifier: QuotaSettings,
    pub insights: InsightsSettings,
    pub pipeline: PipelineSettings,
    pub output: OutputSettings,
}

/// Quota for one admission controller
///
/// All four keys are required when the table is present; an absent table
/// takes the section's default quota.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct QuotaSettings {
    /// Maximum number of requests in flight
    pub max_concurrent: usize,

    /// Sliding window length (milliseconds)
    pub interval_ms: u64,

    /// Maximum number of requests started per window
    pub interval_cap: usize,

    /// Per-request timeout (milliseconds)
    pub timeout_ms: u64,
}

impl QuotaSettings {
    pub fn to_admission_config(&self) -> AdmissionConfig {
        AdmissionConfig {
            max_concurrent: self.max_concurrent,
            interval: Duration::from_millis(self.interval_ms),
            interval_cap: self.interval_cap,
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

impl Default for QuotaSettings {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            interval_ms: 1000,
            interval_cap: 45,
            timeout_ms: 30_000,
        }
    }
}

/// Insights API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct InsightsSettings {
    pub api_key: String,
    pub endpoint: String,
    pub categories: Vec<Category>,

    /// One queue item is created per strategy for every eligible URL
    pub strategies: Vec<Strategy>,

    pub quota: QuotaSettings,
}

impl Default for InsightsSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            categories: Category::all(),
            strategies: Strategy::all(),
            // 400 requests per 100 seconds
            quota: QuotaSettings {
                max_concurrent: 5,
                interval_ms: 100_000,
                interval_cap: 400,
                timeout_ms: 30_000,
            },
        }
    }
}

/// Pipeline behaviour
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PipelineSettings {
    /// Queue items claimed per drain round
    pub batch_size: usize,

    /// Move items left in PROCESSING by an interrupted run back to QUEUED
    pub requeue_interrupted: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            batch_size: 20,
            requeue_interrupted: true,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OutputSettings {
    /// Directory holding the per-day session databases
    pub queue_data_directory: String,

    /// When set, every fetched report is also written here as JSON
    pub report_directory: Option<String>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            queue_data_directory: "./data".to_string(),
            report_directory: None,
        }
    }
}
