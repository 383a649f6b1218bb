//! Round-based discovery over the paginated search
//!
//! A round fetches `batch-size` consecutive search pages concurrently. Each
//! page is a two-request exchange on its own session: a warm-up request to the
//! search landing page (cookies + referer), then the snippet request carrying
//! the result offset. Rounds run one after another until a page reports the
//! end of results.

use crate::config::{Config, JitterWindow, SearchConfig, SiteConfig};
use crate::crawler::fetcher::{fetch_page, JSON_REQUEST_HEADERS};
use crate::crawler::identity::IdentityProvider;
use crate::crawler::retry::RetryPolicy;
use crate::crawler::search::extract_search_page;
use crate::model::BusinessStub;
use crate::storage::Checkpoint;
use crate::url::search_url;
use crate::{ConfigError, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;

/// Result slots per search page
pub const RESULTS_PER_PAGE: u32 = 10;

/// A successfully fetched search page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// The page's organic businesses (possibly none)
    Businesses(Vec<BusinessStub>),

    /// The offset is past the last page of results
    EndOfResults,
}

/// Totals for one discovery run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub rounds: u32,
    pub pages_fetched: u32,
    pub pages_failed: u32,
    pub businesses: usize,
    pub reached_end: bool,
}

/// Drives discovery rounds and appends each page's stubs to the checkpoint
pub struct SearchPaginator {
    identity: Arc<IdentityProvider>,
    retry: RetryPolicy,
    search: SearchConfig,
    site: SiteConfig,
    start_delay: JitterWindow,
    snippet_delay: JitterWindow,
}

impl SearchPaginator {
    pub fn new(
        identity: Arc<IdentityProvider>,
        retry: RetryPolicy,
        search: SearchConfig,
        site: SiteConfig,
        start_delay: JitterWindow,
        snippet_delay: JitterWindow,
    ) -> Self {
        Self {
            identity,
            retry,
            search,
            site,
            start_delay,
            snippet_delay,
        }
    }

    pub fn from_config(config: &Config, identity: Arc<IdentityProvider>) -> Self {
        Self::new(
            identity,
            RetryPolicy::from_config(&config.crawler),
            config.search.clone(),
            config.site.clone(),
            config.crawler.search_start_delay,
            config.crawler.snippet_delay,
        )
    }

    /// Fetches the search page at result offset `start`, with retries
    pub async fn fetch_page(&self, start: u32) -> Result<PageOutcome> {
        let label = format!("search page start={}", start);
        self.retry.run(&label, || self.attempt(start)).await
    }

    async fn attempt(&self, start: u32) -> Result<PageOutcome> {
        self.start_delay.sleep().await;

        let client = self.identity.session()?;
        let terms = [
            ("find_desc", self.search.description.as_str()),
            ("find_loc", self.search.location.as_str()),
        ];

        let landing = self.endpoint("/search", &terms)?;
        let warm_up = fetch_page(&client, landing.as_str(), &[]).await?;

        self.snippet_delay.sleep().await;

        let offset = start.to_string();
        let snippet = self.endpoint(
            "/search/snippet",
            &[terms[0], terms[1], ("start", offset.as_str())],
        )?;

        let mut headers: Vec<(&str, &str)> = JSON_REQUEST_HEADERS.to_vec();
        headers.push(("referer", warm_up.final_url.as_str()));
        let page = fetch_page(&client, snippet.as_str(), &headers).await?;

        if page.body.contains(&self.site.end_of_results_marker) {
            return Ok(PageOutcome::EndOfResults);
        }

        Ok(PageOutcome::Businesses(extract_search_page(
            &page.body, &self.site,
        )?))
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<url::Url> {
        search_url(self.site.base(), path, params)
            .ok_or_else(|| ConfigError::InvalidUrl(self.site.origin.clone()).into())
    }

    /// Runs rounds until a page reports the end of results
    ///
    /// Every page of the final round is still recorded. Page failures are
    /// logged and counted; a checkpoint write failure aborts discovery.
    pub async fn run(&self, checkpoint: &Checkpoint) -> Result<DiscoveryReport> {
        let batch = self.search.batch_size.max(1);
        let mut report = DiscoveryReport::default();
        let mut round_start = 0u32;

        tracing::info!(
            "Discovering {:?} in {:?}, {} pages per round",
            self.search.description,
            self.search.location,
            batch
        );

        loop {
            report.rounds += 1;
            let reached_end = self.run_round(round_start, batch, checkpoint, &mut report).await?;

            if reached_end {
                report.reached_end = true;
                tracing::info!("End of results reached after {} rounds", report.rounds);
                break;
            }

            if let Some(max_rounds) = self.search.max_rounds {
                if report.rounds >= max_rounds {
                    tracing::warn!("Stopping discovery at the {}-round cap", max_rounds);
                    break;
                }
            }

            round_start += RESULTS_PER_PAGE * batch;
        }

        Ok(report)
    }

    async fn run_round(
        &self,
        round_start: u32,
        batch: u32,
        checkpoint: &Checkpoint,
        report: &mut DiscoveryReport,
    ) -> Result<bool> {
        tracing::debug!("Round {} starting at offset {}", report.rounds, round_start);

        let mut pages: FuturesUnordered<_> = (0..batch)
            .map(|i| round_start + RESULTS_PER_PAGE * i)
            .map(|start| async move { (start, self.fetch_page(start).await) })
            .collect();

        let mut reached_end = false;
        while let Some((start, result)) = pages.next().await {
            match result {
                Ok(PageOutcome::Businesses(stubs)) => {
                    checkpoint.record(&stubs)?;
                    report.pages_fetched += 1;
                    report.businesses += stubs.len();
                    tracing::info!(start, "Search page found {} businesses", stubs.len());
                }
                Ok(PageOutcome::EndOfResults) => {
                    reached_end = true;
                    tracing::debug!(start, "Search page past the last result");
                }
                Err(error) => {
                    report.pages_failed += 1;
                    tracing::error!(start, error = %error, "Search page failed");
                }
            }
        }

        Ok(reached_end)
    }
}
