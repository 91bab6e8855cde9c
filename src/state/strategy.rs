use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Device profile an analysis is run against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Strategy {
    Desktop,
    Mobile,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Desktop => "DESKTOP",
            Self::Mobile => "MOBILE",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "DESKTOP" => Some(Self::Desktop),
            "MOBILE" => Some(Self::Mobile),
            _ => None,
        }
    }

    /// Both strategies, in the order items are enqueued
    pub fn all() -> Vec<Self> {
        vec![Self::Desktop, Self::Mobile]
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a strategy name in any letter case, as given on the command line
impl FromStr for Strategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_string(&s.trim().to_ascii_uppercase()).ok_or_else(|| {
            ConfigError::Validation(format!(
                "unknown strategy '{}', expected DESKTOP or MOBILE",
                s
            ))
        })
    }
}
