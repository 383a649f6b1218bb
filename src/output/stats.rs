//! Progress statistics from the files on disk
//!
//! This module reads the discovery checkpoint and the output sink and reports
//! how far the harvest has come without touching the network.

use crate::storage::{Checkpoint, NdjsonSink, StorageResult};
use std::collections::HashSet;
use std::path::Path;

/// Harvest progress summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressStats {
    /// Stub lines in the checkpoint, duplicates included
    pub discovered: usize,

    /// Distinct businesses in the checkpoint
    pub unique_discovered: usize,

    /// Distinct businesses in the output sink
    pub scraped: usize,

    /// Discovered businesses not yet in the output sink
    pub remaining: usize,
}

impl ProgressStats {
    /// Percentage of discovered businesses already scraped
    pub fn completion(&self) -> f64 {
        if self.unique_discovered == 0 {
            return 0.0;
        }
        let done = self.unique_discovered - self.remaining;
        (done as f64 / self.unique_discovered as f64) * 100.0
    }
}

/// Loads progress statistics from a checkpoint and an output file
///
/// Missing files count as empty.
pub fn load_progress(checkpoint_path: &Path, output_path: &Path) -> StorageResult<ProgressStats> {
    let stubs = Checkpoint::load(checkpoint_path)?;
    let scraped = NdjsonSink::scraped_ids(output_path)?;

    let unique: HashSet<&str> = stubs.iter().map(|s| s.biz_id.as_str()).collect();
    let remaining = unique.iter().filter(|id| !scraped.contains(**id)).count();

    Ok(ProgressStats {
        discovered: stubs.len(),
        unique_discovered: unique.len(),
        scraped: scraped.len(),
        remaining,
    })
}

/// Prints progress statistics to stdout in a formatted manner
pub fn print_progress(stats: &ProgressStats) {
    println!("=== Harvest Progress ===\n");

    println!("Discovery:");
    println!("  Stubs in checkpoint: {}", stats.discovered);
    println!("  Unique businesses: {}", stats.unique_discovered);
    println!();

    println!("Details:");
    println!("  Businesses scraped: {}", stats.scraped);
    println!("  Remaining: {}", stats.remaining);
    println!();

    println!(
        "Completion: {:.1}% ({} / {} businesses)",
        stats.completion(),
        stats.unique_discovered - stats.remaining,
        stats.unique_discovered
    );
}
