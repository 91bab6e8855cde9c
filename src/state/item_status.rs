/// Queue item status definitions for tracking fetch progress
///
/// This module defines every status a queue item can hold in a session store.
use crate::storage::StorageError;
use std::fmt;
use std::str::FromStr;

/// Represents the current status of a queue item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemStatus {
    // ===== Active States =====
    /// Item is waiting to be claimed by a batch
    Queued,

    /// Item has been claimed by a batch; its outcome is not yet recorded
    Processing,

    // ===== Terminal States =====
    /// Report was fetched and stored
    Fetched,

    /// Fetch failed; the error message is stored
    Failed,
}

impl ItemStatus {
    /// Returns true if this is a terminal status (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Fetched | Self::Failed)
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Queued => "QUEUED",
            Self::Processing => "PROCESSING",
            Self::Fetched => "FETCHED",
            Self::Failed => "FAILED",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "QUEUED" => Some(Self::Queued),
            "PROCESSING" => Some(Self::Processing),
            "FETCHED" => Some(Self::Fetched),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all possible statuses
    pub fn all_statuses() -> Vec<Self> {
        vec![Self::Queued, Self::Processing, Self::Fetched, Self::Failed]
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

impl FromStr for ItemStatus {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(StorageError::InvalidArgument(
                "status is required".to_string(),
            ));
        }
        Self::from_db_string(s)
            .ok_or_else(|| StorageError::InvalidArgument(format!("unknown status '{}'", s)))
    }
}
