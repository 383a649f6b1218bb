//! Crawl coordinator - two-phase harvest orchestration
//!
//! This module ties the phases together:
//! - Discovery runs only when no checkpoint exists
//! - The checkpoint is read back as the candidate list
//! - Candidates already in the output sink are skipped
//! - The detail pool fetches the rest, isolating per-business failures

use crate::config::Config;
use crate::crawler::fetcher::DetailFetcher;
use crate::crawler::identity::IdentityProvider;
use crate::crawler::paginator::{DiscoveryReport, SearchPaginator};
use crate::model::BusinessStub;
use crate::storage::{Checkpoint, NdjsonSink, RecordSink};
use crate::Result;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

/// Summary of one harvest run
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    /// Present when this run performed discovery
    pub discovery: Option<DiscoveryReport>,

    /// Distinct businesses in the checkpoint
    pub candidates: usize,

    /// Candidates skipped because the output already holds them
    pub already_scraped: usize,

    /// Businesses handed to the detail pool
    pub attempted: usize,

    pub succeeded: usize,

    /// Identifiers of businesses whose detail fetch failed
    pub failed: Vec<String>,

    /// Highest number of simultaneously in-flight detail attempts
    pub peak_in_flight: usize,
}

/// Main harvest coordinator
pub struct Coordinator {
    config: Arc<Config>,
    identity: Arc<IdentityProvider>,
}

impl Coordinator {
    /// Creates a coordinator from a validated configuration and a proxy pool
    pub fn new(config: Config, proxies: Vec<String>) -> Self {
        let identity = IdentityProvider::new(
            &config.identity,
            proxies,
            config.crawler.request_timeout(),
        );

        tracing::debug!(
            "Identity pool: {} user agents, {} proxies",
            config.identity.user_agents.len(),
            identity.proxy_count()
        );

        Self {
            config: Arc::new(config),
            identity: Arc::new(identity),
        }
    }

    /// Runs discovery (if needed) and the detail phase
    ///
    /// Only I/O failures on the checkpoint or output file abort the run.
    pub async fn run(&self) -> Result<CrawlReport> {
        let started = Instant::now();
        let output = &self.config.output;
        let mut report = CrawlReport::default();

        if Checkpoint::exists(&output.checkpoint_path) {
            tracing::info!(
                "Checkpoint found at {}, skipping discovery",
                output.checkpoint_path.display()
            );
        } else {
            let checkpoint = Checkpoint::open(&output.checkpoint_path)?;
            let paginator = SearchPaginator::from_config(&self.config, Arc::clone(&self.identity));
            let discovery = paginator.run(&checkpoint).await?;
            tracing::info!(
                "Discovery finished: {} businesses over {} pages ({} failed) in {}",
                discovery.businesses,
                discovery.pages_fetched,
                discovery.pages_failed,
                checkpoint.path().display()
            );
            report.discovery = Some(discovery);
        }

        let candidates = dedup_by_id(Checkpoint::load(&output.checkpoint_path)?);
        let sink = NdjsonSink::open(&output.output_path)?;
        let remaining = remaining_work(&candidates, &sink);

        report.candidates = candidates.len();
        report.already_scraped = candidates.len() - remaining.len();
        report.attempted = remaining.len();

        tracing::info!(
            "{} businesses to scrape ({} of {} already in {})",
            remaining.len(),
            report.already_scraped,
            report.candidates,
            sink.path().display()
        );

        let fetcher = DetailFetcher::from_config(&self.config, Arc::clone(&self.identity));
        let outcomes = fetcher.run_pool(&remaining, &sink).await?;

        for outcome in &outcomes {
            if outcome.is_success() {
                report.succeeded += 1;
            } else {
                report.failed.push(outcome.biz_id().to_string());
            }
        }
        report.peak_in_flight = fetcher.peak_in_flight();

        tracing::info!(
            "Harvest completed in {:.1}s: {} scraped, {} failed",
            started.elapsed().as_secs_f64(),
            report.succeeded,
            report.failed.len()
        );

        Ok(report)
    }
}

/// Keeps the first occurrence of each business identifier
fn dedup_by_id(stubs: Vec<BusinessStub>) -> Vec<BusinessStub> {
    let mut seen = HashSet::new();
    stubs
        .into_iter()
        .filter(|stub| seen.insert(stub.biz_id.clone()))
        .collect()
}

/// Candidates the sink does not already hold
fn remaining_work(candidates: &[BusinessStub], sink: &dyn RecordSink) -> Vec<BusinessStub> {
    candidates
        .iter()
        .filter(|stub| !sink.has(&stub.biz_id))
        .cloned()
        .collect()
}

/// Runs a complete harvest with the given configuration and proxy pool
pub async fn run_crawl(config: Config, proxies: Vec<String>) -> Result<CrawlReport> {
    Coordinator::new(config, proxies).run().await
}
