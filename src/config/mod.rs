//! Configuration module for Pagespeed-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Command-line flags are merged over the file by the binary before validation.
//!
//! # Example
//!
//! ```no_run
//! use pagespeed_harvest::config::{load_config, validate};
//! use std::path::Path;
//!
//! let mut config = load_config(Path::new("harvest.toml")).unwrap();
//! config.insights.api_key = "my-key".to_string();
//! validate(&config).unwrap();
//! println!("Batch size: {}", config.pipeline.batch_size);
//! ```

mod overrides;
mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{HarvestConfig, InsightsSettings, OutputSettings, PipelineSettings, QuotaSettings};

pub use overrides::ConfigOverrides;

// Re-export parser functions
pub use parser::{load_config, load_validated_config, parse_config};
pub use validation::validate;
