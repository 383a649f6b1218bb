//! Per-session HTTP identities
//!
//! Every page-fetch attempt gets its own client: a freshly drawn user agent,
//! a freshly drawn proxy and an empty cookie jar. A blocked identity is thrown
//! away with the attempt that got blocked instead of being reused.

use crate::config::IdentityConfig;
use crate::url::normalize_proxy;
use rand::seq::IndexedRandom;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Client, Proxy};
use std::time::Duration;

/// One drawn identity: the headers and proxy a session will present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Static headers merged with the drawn user agent
    pub headers: Vec<(String, String)>,

    /// Proxy URL with an explicit scheme
    pub proxy: Option<String>,

    /// Total timeout applied to each request
    pub timeout: Duration,
}

impl Identity {
    /// The drawn user agent, if any
    pub fn user_agent(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("user-agent"))
            .map(|(_, value)| value.as_str())
    }

    /// Builds an HTTP client presenting this identity
    ///
    /// Cookies persist for the lifetime of the client, which is what lets a
    /// warm-up request establish the session a follow-up request relies on.
    pub fn build_client(&self) -> Result<Client, reqwest::Error> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => tracing::warn!("Skipping invalid header {}: {}", name, value),
            }
        }

        let mut builder = Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .timeout(self.timeout)
            .gzip(true)
            .brotli(true);

        if let Some(proxy) = &self.proxy {
            builder = builder.proxy(Proxy::all(proxy.as_str())?);
        }

        builder.build()
    }
}

/// Draws session identities from immutable pools
#[derive(Debug, Clone)]
pub struct IdentityProvider {
    headers: Vec<(String, String)>,
    user_agents: Vec<String>,
    proxies: Vec<String>,
    timeout: Duration,
}

impl IdentityProvider {
    /// Creates a provider from the identity pools and a request timeout
    ///
    /// Proxies are normalized to carry an explicit scheme.
    pub fn new(config: &IdentityConfig, proxies: Vec<String>, timeout: Duration) -> Self {
        Self {
            headers: config
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            user_agents: config.user_agents.clone(),
            proxies: proxies.iter().map(|p| normalize_proxy(p)).collect(),
            timeout,
        }
    }

    /// Draws a new identity: a uniformly random user agent and proxy
    pub fn draw(&self) -> Identity {
        let mut rng = rand::rng();
        let mut headers: Vec<(String, String)> = self
            .headers
            .iter()
            .filter(|(name, _)| {
                self.user_agents.is_empty() || !name.eq_ignore_ascii_case("user-agent")
            })
            .cloned()
            .collect();

        if let Some(agent) = self.user_agents.choose(&mut rng) {
            headers.push((USER_AGENT.as_str().to_string(), agent.clone()));
        }

        Identity {
            headers,
            proxy: self.proxies.choose(&mut rng).cloned(),
            timeout: self.timeout,
        }
    }

    /// Draws an identity and builds its client
    pub fn session(&self) -> Result<Client, reqwest::Error> {
        let identity = self.draw();
        tracing::trace!(
            "New session: user-agent={:?}, proxy={:?}",
            identity.user_agent(),
            identity.proxy
        );
        identity.build_client()
    }

    pub fn proxy_count(&self) -> usize {
        self.proxies.len()
    }
}
