//! Run statistics
//!
//! A fresh [`GenerationStats`] is created at the start of every run; nothing
//! carries over between runs.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::time::Duration;

/// Counters for one generation run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationStats {
    /// Pages in the final document, skipped ones included
    pub total_pages: usize,
    pub successful_pages: usize,
    pub failed_pages: usize,
    pub truncated_pages: usize,

    /// Characters of page content in the final document
    pub total_content_length: usize,

    #[serde(serialize_with = "serialize_millis")]
    pub duration: Duration,

    /// True when the total character budget stopped page inclusion
    pub global_limit_reached: bool,

    pub discovered_urls: usize,
    pub discovered_files: usize,

    /// Pages dropped by the content filter
    pub filtered_out: usize,

    pub started_at: DateTime<Utc>,
}

impl GenerationStats {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            total_pages: 0,
            successful_pages: 0,
            failed_pages: 0,
            truncated_pages: 0,
            total_content_length: 0,
            duration: Duration::ZERO,
            global_limit_reached: false,
            discovered_urls: 0,
            discovered_files: 0,
            filtered_out: 0,
            started_at,
        }
    }
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

/// Prints statistics in a human-readable format
pub fn print_statistics(stats: &GenerationStats) {
    println!("=== Generation Statistics ===\n");

    println!("Discovery:");
    println!("  URLs discovered: {}", stats.discovered_urls);
    println!("  Files discovered: {}", stats.discovered_files);
    if stats.filtered_out > 0 {
        println!("  Filtered out: {}", stats.filtered_out);
    }
    println!();

    println!("Pages:");
    println!("  Total: {}", stats.total_pages);
    println!("  Successful: {}", stats.successful_pages);
    println!("  Failed: {}", stats.failed_pages);
    println!("  Truncated: {}", stats.truncated_pages);
    println!();

    println!("Content:");
    println!("  Characters: {}", stats.total_content_length);
    if stats.global_limit_reached {
        println!("  Global character limit reached; remaining pages omitted");
    }
    println!();

    println!(
        "Completed in {:.2}s (started {})",
        stats.duration.as_secs_f64(),
        stats.started_at.to_rfc3339()
    );
}
