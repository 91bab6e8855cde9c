//! State module for tracking fetch progress
//!
//! # Components
//!
//! - `ItemStatus`: Tracks the status of individual queue items (queued, processing, fetched, failed)
//! - `Strategy`: The device profile a report is requested for

mod item_status;
mod strategy;

// Re-export main types
pub use item_status::ItemStatus;
pub use strategy::Strategy;
