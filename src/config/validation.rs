use crate::config::types::{HarvestConfig, InsightsSettings, PipelineSettings, QuotaSettings};
use crate::ConfigError;
use url::Url;

/// Upper bound for quota durations: one day
const MAX_QUOTA_MS: u64 = 86_400_000;

/// Validates the entire configuration
pub fn validate(config: &HarvestConfig) -> Result<(), ConfigError> {
    validate_quota("classifier", &config.classifier)?;
    validate_insights(&config.insights)?;
    validate_pipeline(&config.pipeline)?;

    if config.output.queue_data_directory.trim().is_empty() {
        return Err(ConfigError::Validation(
            "queue-data-directory cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates one admission quota
fn validate_quota(section: &str, quota: &QuotaSettings) -> Result<(), ConfigError> {
    if quota.max_concurrent < 1 || quota.max_concurrent > 100 {
        return Err(ConfigError::Validation(format!(
            "{}: max-concurrent must be between 1 and 100, got {}",
            section, quota.max_concurrent
        )));
    }

    if quota.interval_cap < 1 {
        return Err(ConfigError::Validation(format!(
            "{}: interval-cap must be >= 1, got {}",
            section, quota.interval_cap
        )));
    }

    if quota.interval_ms < 1 || quota.interval_ms > MAX_QUOTA_MS {
        return Err(ConfigError::Validation(format!(
            "{}: interval-ms must be between 1 and {}, got {}",
            section, MAX_QUOTA_MS, quota.interval_ms
        )));
    }

    if quota.timeout_ms < 1 || quota.timeout_ms > MAX_QUOTA_MS {
        return Err(ConfigError::Validation(format!(
            "{}: timeout-ms must be between 1 and {}, got {}",
            section, MAX_QUOTA_MS, quota.timeout_ms
        )));
    }

    Ok(())
}

/// Validates insights API configuration
fn validate_insights(config: &InsightsSettings) -> Result<(), ConfigError> {
    if config.api_key.trim().is_empty() {
        return Err(ConfigError::Validation(
            "an insights API key is required".to_string(),
        ));
    }

    let endpoint = Url::parse(&config.endpoint)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid endpoint: {}", e)))?;
    if endpoint.scheme() != "http" && endpoint.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "endpoint '{}' must use http or https",
            config.endpoint
        )));
    }

    if config.strategies.is_empty() {
        return Err(ConfigError::Validation(
            "at least one strategy is required".to_string(),
        ));
    }

    if config.categories.is_empty() {
        return Err(ConfigError::Validation(
            "at least one category is required".to_string(),
        ));
    }

    validate_quota("insights.quota", &config.quota)
}

/// Validates pipeline configuration
fn validate_pipeline(config: &PipelineSettings) -> Result<(), ConfigError> {
    if config.batch_size < 1 || config.batch_size > 1000 {
        return Err(ConfigError::Validation(format!(
            "batch-size must be between 1 and 1000, got {}",
            config.batch_size
        )));
    }

    Ok(())
}
