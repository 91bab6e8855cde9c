use crate::config::types::HarvestConfig;
use crate::config::validation::validate;
use crate::ConfigError;
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(HarvestConfig)` - Successfully loaded configuration
/// * `Err(ConfigError)` - Failed to load or parse the configuration
///
/// The result is not validated: the API key commonly arrives from the
/// command line afterwards. Call `validate` once every source is merged.
pub fn load_config(path: &Path) -> Result<HarvestConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses configuration from TOML text
pub fn parse_config(content: &str) -> Result<HarvestConfig, ConfigError> {
    let config: HarvestConfig = toml::from_str(content)?;
    Ok(config)
}

/// Loads a configuration file and validates it as-is
pub fn load_validated_config(path: &Path) -> Result<HarvestConfig, ConfigError> {
    let config = load_config(path)?;
    validate(&config)?;
    Ok(config)
}
