//! Crawler module for business discovery and detail harvesting
//!
//! This module contains the core harvesting logic, including:
//! - Per-session identities (user agent, proxy, cookie jar)
//! - Retry with randomized backoff
//! - Search payload and detail page extraction
//! - Round-based discovery and the bounded detail pool
//! - Overall run coordination

mod coordinator;
pub mod detail;
pub mod fetcher;
pub mod identity;
pub mod paginator;
pub mod props;
pub mod retry;
pub mod search;

pub use coordinator::{run_crawl, Coordinator, CrawlReport};
pub use detail::extract_business;
pub use fetcher::{fetch_business_props, fetch_page, DetailFetcher, DetailOutcome, FetchedPage};
pub use identity::{Identity, IdentityProvider};
pub use paginator::{DiscoveryReport, PageOutcome, SearchPaginator, RESULTS_PER_PAGE};
pub use retry::RetryPolicy;
pub use search::extract_search_page;
