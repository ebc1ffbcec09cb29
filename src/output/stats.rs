//! Statistics generation from the scrape database
//!
//! This module provides functionality for computing and displaying
//! run statistics from the storage layer.

use crate::state::ScrapeStatus;
use crate::storage::{RecordFilter, ScrapeStore, StorageResult};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Window used for the `recent` count
pub const RECENT_WINDOW_HOURS: i64 = 24;

/// Scrape statistics summary
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    /// Total number of stored records
    pub total: u64,

    pub successful: u64,
    pub failed: u64,

    /// Records scraped within the last 24 hours
    pub recent: u64,

    /// `successful / total * 100`, rounded to two decimals, or 0 when empty
    pub success_rate: f64,
}

impl RunStats {
    /// Derives the success rate from the counts
    pub fn new(total: u64, successful: u64, failed: u64, recent: u64) -> Self {
        Self {
            total,
            successful,
            failed,
            recent,
            success_rate: success_rate(successful, total),
        }
    }
}

fn success_rate(successful: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let rate = successful as f64 / total as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}

/// Computes statistics from storage
///
/// # Arguments
///
/// * `store` - The storage backend to query
/// * `now` - Reference time for the recent window
///
/// # Returns
///
/// * `Ok(RunStats)` - Successfully computed statistics
/// * `Err(StorageError)` - A count query failed
pub fn compute_stats(store: &dyn ScrapeStore, now: DateTime<Utc>) -> StorageResult<RunStats> {
    let total = store.count_records(&RecordFilter::All)?;
    let successful = store.count_records(&RecordFilter::Status(ScrapeStatus::Success))?;
    let failed = store.count_records(&RecordFilter::Status(ScrapeStatus::Failed))?;

    let since = now - Duration::hours(RECENT_WINDOW_HOURS);
    let recent = store.count_records(&RecordFilter::ScrapedSince(since))?;

    Ok(RunStats::new(total, successful, failed, recent))
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &RunStats) {
    println!("=== Scrape Statistics ===\n");

    println!("Overview:");
    println!("  Total records: {}", stats.total);
    println!("  Successful: {}", stats.successful);
    println!("  Failed: {}", stats.failed);
    let other = stats.total.saturating_sub(stats.successful + stats.failed);
    if other > 0 {
        println!("  Partial: {}", other);
    }
    println!("  Scraped in last {}h: {}", RECENT_WINDOW_HOURS, stats.recent);
    println!();

    println!(
        "Success Rate: {:.2}% ({} / {} records successfully scraped)",
        stats.success_rate, stats.successful, stats.total
    );
}
