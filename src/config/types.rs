use rand::Rng;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Bizcrawl
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub search: SearchConfig,
    pub crawler: CrawlerConfig,
    pub identity: IdentityConfig,
    pub site: SiteConfig,
    pub output: OutputConfig,
}

/// What to search for and how wide each discovery round is
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Free-text category or description (e.g. "Restaurants")
    pub description: String,

    /// Free-text location (e.g. "Las Vegas")
    pub location: String,

    /// Number of search pages fetched concurrently per round
    #[serde(rename = "batch-size")]
    pub batch_size: u32,

    /// Optional cap on discovery rounds
    #[serde(rename = "max-rounds")]
    pub max_rounds: Option<u32>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            description: "Restaurants".to_string(),
            location: "Las Vegas".to_string(),
            batch_size: 10,
            max_rounds: None,
        }
    }
}

/// Concurrency, timeouts, retries and pacing
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of in-flight detail fetches
    pub concurrency: u32,

    /// Total timeout for a single request (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Attempts per fetch before giving up
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Backoff between attempts after a transport or load failure
    #[serde(rename = "retry-backoff")]
    pub retry_backoff: JitterWindow,

    /// Backoff between attempts after a challenge page; defaults to `retry-backoff`
    #[serde(rename = "challenge-backoff")]
    pub challenge_backoff: Option<JitterWindow>,

    /// Delay before a search page's warm-up request
    #[serde(rename = "search-start-delay")]
    pub search_start_delay: JitterWindow,

    /// Delay between the warm-up request and the snippet request
    #[serde(rename = "snippet-delay")]
    pub snippet_delay: JitterWindow,

    /// Delay before each detail page request
    #[serde(rename = "detail-delay")]
    pub detail_delay: JitterWindow,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            concurrency: 20,
            request_timeout_secs: 10,
            max_attempts: 5,
            retry_backoff: JitterWindow::from_millis(2_000, 8_000),
            challenge_backoff: None,
            search_start_delay: JitterWindow::from_millis(0, 2_000),
            snippet_delay: JitterWindow::from_millis(2_000, 5_000),
            detail_delay: JitterWindow::from_millis(0, 5_000),
        }
    }
}

impl CrawlerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The backoff class applied to challenge errors
    pub fn effective_challenge_backoff(&self) -> JitterWindow {
        self.challenge_backoff.unwrap_or(self.retry_backoff)
    }
}

/// A uniform random delay range, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct JitterWindow {
    #[serde(rename = "min-ms")]
    pub min_ms: u64,

    #[serde(rename = "max-ms")]
    pub max_ms: u64,
}

impl JitterWindow {
    pub const fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub const fn zero() -> Self {
        Self::from_millis(0, 0)
    }

    /// Draws a uniformly random duration from the window
    pub fn sample(&self) -> Duration {
        if self.max_ms <= self.min_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(rand::rng().random_range(self.min_ms..=self.max_ms))
    }

    /// Sleeps for a freshly sampled duration
    pub async fn sleep(&self) {
        let delay = self.sample();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Pools the identity provider draws from
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// User-agent pool; one is drawn per session
    #[serde(rename = "user-agents")]
    pub user_agents: Vec<String>,

    /// Static headers sent with every request
    pub headers: BTreeMap<String, String>,

    /// Plain-text proxy list, one address per line
    #[serde(rename = "proxies-file")]
    pub proxies_file: Option<PathBuf>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        let user_agents = [
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/133.0.0.0 Safari/537.36",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.3",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/133.0.0.0 Safari/537.36",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/133.0.0.0 Safari/537.36",
        ];

        let headers = [
            (
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
            ),
            ("Accept-Language", "en;q=0.6"),
            ("Connection", "keep-alive"),
            ("Referer", "https://www.google.com/"),
        ];

        Self {
            user_agents: user_agents.iter().map(|s| s.to_string()).collect(),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            proxies_file: None,
        }
    }
}

/// The target site and the markers that identify its special responses
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Scheme and host every endpoint is built from
    pub origin: String,

    /// Substring identifying an anti-bot challenge page
    #[serde(rename = "challenge-marker")]
    pub challenge_marker: String,

    /// Substring identifying the end of paginated search results
    #[serde(rename = "end-of-results-marker")]
    pub end_of_results_marker: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            origin: "https://www.yelp.com".to_string(),
            challenge_marker: r#"src="https://ct.captcha-delivery.com/i.js""#.to_string(),
            end_of_results_marker: "excessivePaging".to_string(),
        }
    }
}

impl SiteConfig {
    /// The origin without a trailing slash
    pub fn base(&self) -> &str {
        self.origin.trim_end_matches('/')
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Discovery checkpoint: one business stub per line
    #[serde(rename = "checkpoint-path")]
    pub checkpoint_path: PathBuf,

    /// Detail output: one business record per line
    #[serde(rename = "output-path")]
    pub output_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            checkpoint_path: PathBuf::from("businesses.ndjson"),
            output_path: PathBuf::from("results.ndjson"),
        }
    }
}
