//! Storage traits and error types
//!
//! This module defines the trait interface for session queue backends and
//! associated error types.

use crate::state::ItemStatus;
use crate::storage::{IgnoreEntry, NewIgnoreEntry, NewQueueItem, QueueFilter, QueueItem};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage fault: {0}")]
    Fault(#[from] rusqlite::Error),

    #[error("Queue item not found: {0}")]
    NotFound(i64),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Store has been closed")]
    Closed,

    #[error("Report serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for session queue backends
///
/// The store is the single source of truth for what has already been
/// attempted in a session. All mutating calls are either single statements
/// or one explicit transaction.
pub trait QueueStore {
    // ===== Queue Management =====

    /// Enqueues new items with status QUEUED
    ///
    /// The whole slice is written in one transaction; on failure none of it
    /// is persisted.
    fn enqueue(&mut self, items: &[NewQueueItem]) -> StorageResult<()>;

    /// Gets up to `limit` items with the given status, oldest first
    ///
    /// An empty result means nothing is left with that status.
    fn next_batch(&self, status: ItemStatus, limit: usize) -> StorageResult<Vec<QueueItem>>;

    /// Updates an item's status, error message and report
    ///
    /// A `None` error message or report clears the corresponding column.
    ///
    /// # Errors
    ///
    /// * `StorageError::InvalidArgument` - `id` is not a valid key
    /// * `StorageError::NotFound` - no item with `id` exists
    fn update_status(
        &mut self,
        id: i64,
        status: ItemStatus,
        error_message: Option<&str>,
        report: Option<&Value>,
    ) -> StorageResult<()>;

    /// Moves every item in `from` to `to`, returning how many rows moved
    fn requeue_status(&mut self, from: ItemStatus, to: ItemStatus) -> StorageResult<usize>;

    /// Reads a snapshot of the queue
    fn all_items(&self, filter: &QueueFilter) -> StorageResult<Vec<QueueItem>>;

    // ===== Ignore List =====

    /// Adds ignore entries in one transaction
    fn add_ignore_entries(&mut self, entries: &[NewIgnoreEntry]) -> StorageResult<()>;

    /// Gets ignore entries, oldest first
    fn ignore_entries(&self, limit: Option<usize>) -> StorageResult<Vec<IgnoreEntry>>;

    // ===== Statistics =====

    /// Counts queue items per status
    fn count_by_status(&self) -> StorageResult<HashMap<ItemStatus, u64>>;

    /// Counts ignore entries
    fn count_ignored(&self) -> StorageResult<u64>;

    // ===== Lifecycle =====

    /// Releases the underlying storage handle
    ///
    /// After this call every operation, including a second close, fails
    /// with `StorageError::Closed`.
    fn close(&mut self) -> StorageResult<()>;
}
