//! Output module for run reports and progress statistics
//!
//! This module handles:
//! - Reading progress back from the checkpoint and output files
//! - Printing progress and end-of-run summaries

pub mod stats;

pub use stats::{load_progress, print_progress, ProgressStats};

use crate::crawler::CrawlReport;

/// Prints an end-of-run report to stdout
pub fn print_report(report: &CrawlReport) {
    println!("=== Harvest Report ===\n");

    match &report.discovery {
        Some(discovery) => {
            println!("Discovery:");
            println!("  Rounds: {}", discovery.rounds);
            println!("  Pages fetched: {}", discovery.pages_fetched);
            println!("  Pages failed: {}", discovery.pages_failed);
            println!("  Businesses found: {}", discovery.businesses);
        }
        None => println!("Discovery: skipped (checkpoint present)"),
    }
    println!();

    println!("Details:");
    println!("  Candidates: {}", report.candidates);
    println!("  Already scraped: {}", report.already_scraped);
    println!("  Attempted: {}", report.attempted);
    println!("  Succeeded: {}", report.succeeded);
    println!("  Failed: {}", report.failed.len());
    println!("  Peak in-flight: {}", report.peak_in_flight);

    if !report.failed.is_empty() {
        println!("\nFailed businesses:");
        for biz_id in &report.failed {
            println!("  - {}", biz_id);
        }
    }
}
