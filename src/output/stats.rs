//! Statistics generation from a session database
//!
//! This module provides functionality for extracting and displaying
//! queue statistics from the storage layer.

use crate::state::ItemStatus;
use crate::storage::QueueStore;
use crate::Result;
use std::collections::HashMap;

/// Session statistics summary
#[derive(Debug, Clone, Default)]
pub struct QueueStatistics {
    /// Total number of queue items
    pub total: u64,

    /// Count of queue items by status
    pub by_status: HashMap<ItemStatus, u64>,

    /// Number of URLs on the ignore list
    pub ignored: u64,
}

impl QueueStatistics {
    /// Count for one status, zero when absent
    pub fn count(&self, status: ItemStatus) -> u64 {
        self.by_status.get(&status).copied().unwrap_or(0)
    }

    /// Number of items in a terminal status
    pub fn finished(&self) -> u64 {
        self.by_status
            .iter()
            .filter(|(status, _)| status.is_terminal())
            .map(|(_, count)| count)
            .sum()
    }

    /// Percentage of finished items that were fetched
    pub fn success_rate(&self) -> f64 {
        let finished = self.finished();
        if finished == 0 {
            return 0.0;
        }
        (self.count(ItemStatus::Fetched) as f64 / finished as f64) * 100.0
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `store` - The session store to query
///
/// # Returns
///
/// * `Ok(QueueStatistics)` - Successfully loaded statistics
/// * `Err(HarvestError)` - Failed to query statistics
pub fn load_statistics(store: &dyn QueueStore) -> Result<QueueStatistics> {
    let by_status = store.count_by_status()?;
    let total = by_status.values().sum();
    let ignored = store.count_ignored()?;

    Ok(QueueStatistics {
        total,
        by_status,
        ignored,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &QueueStatistics) {
    println!("=== Session Statistics ===\n");

    println!("Overview:");
    println!("  Queue items: {}", stats.total);
    println!("  Ignored URLs: {}", stats.ignored);
    println!();

    println!("Items by Status:");
    for status in ItemStatus::all_statuses() {
        let count = stats.count(status);
        let percentage = if stats.total > 0 {
            (count as f64 / stats.total as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
    println!();

    println!(
        "Success Rate: {:.1}% ({} fetched / {} failed)",
        stats.success_rate(),
        stats.count(ItemStatus::Fetched),
        stats.count(ItemStatus::Failed)
    );
}
