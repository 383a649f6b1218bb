//! URL handling module for Bizcrawl
//!
//! This module resolves the site-relative URLs found in search payloads,
//! normalizes proxy addresses and decodes the site's outbound redirect links.

mod normalize;

pub use normalize::{absolute_business_url, normalize_proxy, redirect_target, search_url};
