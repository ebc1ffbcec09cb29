//! Output module for reporting scrape results
//!
//! This module handles:
//! - Computing run statistics over the store
//! - Rendering scrape results and stored records for the console
//! - JSON rendering of the same data

pub mod stats;

pub use stats::{compute_stats, print_statistics, RunStats};

use crate::crawler::ScrapeResult;
use crate::storage::StoredRecord;
use serde::Serialize;

/// Longest title shown in a listing line
const TITLE_WIDTH: usize = 60;

/// Formats one scrape result as a single console line
pub fn format_result(input: &str, result: &ScrapeResult) -> String {
    match (&result.data, result.success) {
        (Some(record), true) => format!(
            "[ok]     {} - {}",
            record.url,
            truncate(record.title.as_deref().unwrap_or(""), TITLE_WIDTH)
        ),
        (Some(record), false) => format!(
            "[failed] {} - {}",
            record.url,
            result.error.as_deref().unwrap_or("unknown error")
        ),
        (None, _) => format!(
            "[failed] {} - {}",
            input,
            result.error.as_deref().unwrap_or("unknown error")
        ),
    }
}

/// Prints one line per result, paired with the input it came from
pub fn print_results<S: AsRef<str>>(inputs: &[S], results: &[ScrapeResult]) {
    for (input, result) in inputs.iter().zip(results) {
        println!("{}", format_result(input.as_ref(), result));
    }
}

/// Formats a stored record as a single console line
pub fn format_record(record: &StoredRecord) -> String {
    let scraped = &record.record;
    format!(
        "#{:<5} {:<7} {}  {} - {}",
        record.id,
        scraped.status,
        scraped.scraped_at.format("%Y-%m-%d %H:%M:%S"),
        scraped.url,
        truncate(
            scraped
                .title
                .as_deref()
                .or(scraped.error.as_deref())
                .unwrap_or(""),
            TITLE_WIDTH
        )
    )
}

/// Prints stored records, one per line
pub fn print_records(records: &[StoredRecord]) {
    if records.is_empty() {
        println!("No records found.");
        return;
    }

    println!("=== Stored Records ({}) ===\n", records.len());
    for record in records {
        println!("{}", format_record(record));
    }
}

/// Prints any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}
