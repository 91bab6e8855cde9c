//! Storage module for the durable session queue
//!
//! This module handles all database operations for a crawl session, including:
//! - SQLite database initialization and schema management
//! - The fetch work queue and its status transitions
//! - The ignore list of URLs that are not eligible for analysis
//! - Crash recovery support for items left in PROCESSING

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteQueueStore;
pub use traits::{QueueStore, StorageError, StorageResult};

use crate::state::{ItemStatus, Strategy};
use serde_json::Value;
use std::path::Path;

/// Opens or creates a session store
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
pub fn open_store(path: &Path) -> StorageResult<SqliteQueueStore> {
    SqliteQueueStore::open(path)
}

/// One unit of fetch work as persisted in the queue
#[derive(Debug, Clone, PartialEq)]
pub struct QueueItem {
    pub id: i64,
    pub url: String,
    pub strategy: Strategy,
    pub status: ItemStatus,
    pub error_message: Option<String>,
    pub report: Option<Value>,
}

/// Request to enqueue one (url, strategy) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NewQueueItem {
    pub url: String,
    pub strategy: Strategy,
}

impl NewQueueItem {
    pub fn new(url: impl Into<String>, strategy: Strategy) -> Self {
        Self {
            url: url.into(),
            strategy,
        }
    }
}

/// A URL determined not to be eligible for analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoreEntry {
    pub id: i64,
    pub url: String,
    pub http_status: i32,
    pub content_type: String,
}

/// Request to add an ignore entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIgnoreEntry {
    pub url: String,
    pub http_status: i32,
    pub content_type: String,
}

/// Filter for reading a snapshot of the queue
#[derive(Debug, Clone, Default)]
pub struct QueueFilter {
    /// Only items with this status; all items when None
    pub status: Option<ItemStatus>,

    /// Maximum number of rows; unlimited when None
    pub limit: Option<usize>,

    /// Whether to load the (potentially large) report column
    pub include_report: bool,
}

impl QueueFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_status(status: ItemStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn include_report(mut self) -> Self {
        self.include_report = true;
        self
    }
}
