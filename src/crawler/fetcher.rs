//! HTTP fetching and the detail fetch pool
//!
//! This module handles every page request the harvester makes:
//! - A plain GET helper that keeps the final URL (search warm-ups use it as
//!   the referer of the follow-up request)
//! - The auxiliary business document request
//! - The bounded detail pool: one retried unit per business, each attempt
//!   holding a semaphore permit and a fresh session

use crate::config::{Config, JitterWindow, SiteConfig};
use crate::crawler::detail::extract_business;
use crate::crawler::identity::IdentityProvider;
use crate::crawler::retry::RetryPolicy;
use crate::model::{BusinessStub, ScrapedBusiness};
use crate::storage::RecordSink;
use crate::{HarvestError, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use reqwest::Client;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Headers sent with the site's XHR-style JSON endpoints
pub const JSON_REQUEST_HEADERS: [(&str, &str); 2] = [
    ("accept", "application/json"),
    ("x-requested-with", "XMLHttpRequest"),
];

/// A fetched response body
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: String,

    /// Response body
    pub body: String,
}

/// Fetches a URL and returns its body regardless of status
///
/// Challenge pages are frequently served with an error status; their body is
/// still needed to tell a challenge from a page that failed to load, so a
/// non-success status is only logged here.
///
/// # Errors
///
/// [`HarvestError::Http`] for connection, timeout and body-read failures.
pub async fn fetch_page(
    client: &Client,
    url: &str,
    headers: &[(&str, &str)],
) -> Result<FetchedPage> {
    let mut request = client.get(url);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }

    let response = request.send().await.map_err(|source| HarvestError::Http {
        url: url.to_string(),
        source,
    })?;

    let status = response.status();
    let final_url = response.url().to_string();
    if !status.is_success() {
        tracing::debug!("{} returned HTTP {}", url, status.as_u16());
    }

    let body = response.text().await.map_err(|source| HarvestError::Http {
        url: url.to_string(),
        source,
    })?;

    Ok(FetchedPage { final_url, body })
}

/// Fetches a business's auxiliary JSON document
///
/// Returns `Ok(None)` when the endpoint answers with a JSON `null`.
pub async fn fetch_business_props(
    client: &Client,
    site: &SiteConfig,
    stub: &BusinessStub,
) -> Result<Option<Value>> {
    let url = format!("{}/biz/{}/props", site.base(), stub.biz_id);

    let mut request = client.get(&url);
    for (name, value) in JSON_REQUEST_HEADERS {
        request = request.header(name, value);
    }

    let response = request
        .header(reqwest::header::REFERER, stub.business_url.as_str())
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|source| HarvestError::Http {
            url: url.clone(),
            source,
        })?;

    let body = response.text().await.map_err(|source| HarvestError::Http {
        url: url.clone(),
        source,
    })?;

    match serde_json::from_str::<Value>(&body)? {
        Value::Null => Ok(None),
        value => Ok(Some(value)),
    }
}

/// Counts in-flight detail attempts and remembers the peak
#[derive(Debug, Default)]
pub struct InFlightGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlightGauge {
    fn enter(&self) -> InFlightGuard<'_> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        InFlightGuard { gauge: self }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct InFlightGuard<'a> {
    gauge: &'a InFlightGauge,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.gauge.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// What happened to one business in the detail pool
#[derive(Debug)]
pub enum DetailOutcome {
    /// The record was extracted and appended to the sink
    Scraped { biz_id: String },

    /// Every attempt failed, or the failure was not retryable
    Failed { biz_id: String, error: HarvestError },
}

impl DetailOutcome {
    pub fn biz_id(&self) -> &str {
        match self {
            Self::Scraped { biz_id } | Self::Failed { biz_id, .. } => biz_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Scraped { .. })
    }
}

/// Fetches and extracts business detail pages under a global concurrency bound
pub struct DetailFetcher {
    identity: Arc<IdentityProvider>,
    retry: RetryPolicy,
    semaphore: Arc<Semaphore>,
    site: SiteConfig,
    delay: JitterWindow,
    gauge: InFlightGauge,
}

impl DetailFetcher {
    /// Creates a fetcher allowing at most `concurrency` in-flight attempts
    pub fn new(
        identity: Arc<IdentityProvider>,
        retry: RetryPolicy,
        concurrency: usize,
        site: SiteConfig,
        delay: JitterWindow,
    ) -> Self {
        Self {
            identity,
            retry,
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
            site,
            delay,
            gauge: InFlightGauge::default(),
        }
    }

    pub fn from_config(config: &Config, identity: Arc<IdentityProvider>) -> Self {
        Self::new(
            identity,
            RetryPolicy::from_config(&config.crawler),
            config.crawler.concurrency as usize,
            config.site.clone(),
            config.crawler.detail_delay,
        )
    }

    /// Fetches one business, retrying the page + auxiliary pair as a unit
    pub async fn fetch(&self, stub: &BusinessStub) -> Result<ScrapedBusiness> {
        self.retry.run(&stub.biz_id, || self.attempt(stub)).await
    }

    /// One attempt: the permit is held for the request pair only, never
    /// across the retry backoff
    async fn attempt(&self, stub: &BusinessStub) -> Result<ScrapedBusiness> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| HarvestError::PoolClosed)?;
        let _in_flight = self.gauge.enter();

        self.delay.sleep().await;

        let client = self.identity.session()?;
        let page = fetch_page(&client, &stub.business_url, &[]).await?;
        let props = fetch_business_props(&client, &self.site, stub).await?;

        let record = extract_business(&page.body, props.as_ref(), &self.site)?;
        Ok(ScrapedBusiness::new(stub, record))
    }

    /// Fetches every stub and appends each success to `sink`
    ///
    /// Per-business failures are logged and collected; they never stop the
    /// pool. A sink write failure is returned immediately.
    pub async fn run_pool(
        &self,
        stubs: &[BusinessStub],
        sink: &dyn RecordSink,
    ) -> Result<Vec<DetailOutcome>> {
        let mut tasks: FuturesUnordered<_> = stubs
            .iter()
            .map(|stub| async move { (stub, self.fetch(stub).await) })
            .collect();

        let mut outcomes = Vec::with_capacity(stubs.len());
        while let Some((stub, result)) = tasks.next().await {
            match result {
                Ok(business) => {
                    sink.append(&business)?;
                    tracing::info!(
                        biz_id = %stub.biz_id,
                        "Scraped {} ({}/{})",
                        stub.name,
                        outcomes.len() + 1,
                        stubs.len()
                    );
                    outcomes.push(DetailOutcome::Scraped {
                        biz_id: stub.biz_id.clone(),
                    });
                }
                Err(error) => {
                    tracing::error!(
                        biz_id = %stub.biz_id,
                        error = %error,
                        "Failed to scrape {}",
                        stub.business_url
                    );
                    outcomes.push(DetailOutcome::Failed {
                        biz_id: stub.biz_id.clone(),
                        error,
                    });
                }
            }
        }

        Ok(outcomes)
    }

    /// Highest number of simultaneously in-flight attempts observed
    pub fn peak_in_flight(&self) -> usize {
        self.gauge.peak()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gauge_tracks_peak() {
        let gauge = InFlightGauge::default();
        {
            let _a = gauge.enter();
            let _b = gauge.enter();
            assert_eq!(gauge.current.load(Ordering::SeqCst), 2);
        }
        let _c = gauge.enter();
        assert_eq!(gauge.current.load(Ordering::SeqCst), 1);
        assert_eq!(gauge.peak(), 2);
    }

    #[test]
    fn test_outcome_accessors() {
        let ok = DetailOutcome::Scraped {
            biz_id: "a".to_string(),
        };
        let failed = DetailOutcome::Failed {
            biz_id: "b".to_string(),
            error: HarvestError::PoolClosed,
        };
        assert!(ok.is_success());
        assert!(!failed.is_success());
        assert_eq!(failed.biz_id(), "b");
    }
}
