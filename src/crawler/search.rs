//! Search-results payload extraction
//!
//! The search snippet endpoint returns a large JSON-ish blob that is not
//! reliably valid JSON, so business entries are located by pattern rather
//! than by parsing the whole document.

use crate::config::SiteConfig;
use crate::model::BusinessStub;
use crate::url::absolute_business_url;
use crate::{ExtractError, ExtractResult};
use regex::Regex;
use std::sync::LazyLock;

/// One `{"bizId": ..., "searchResultBusiness": {...}}` entry
static BUSINESS_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)\{\s*"bizId"\s*:\s*"([^"]+)"\s*,\s*"searchResultBusiness"\s*:\s*\{.*?"ranking"\s*:\s*(\d+).*?"isAd"\s*:\s*(true|false).*?"name"\s*:\s*"([^"]+).*?"businessUrl"\s*:\s*"([^"]+)""#,
    )
    .expect("valid business entry regex")
});

/// An entry as it appears in the payload, before sponsored results are dropped
#[derive(Debug, Clone, PartialEq, Eq)]
struct RawEntry {
    biz_id: String,
    ranking: u32,
    is_ad: bool,
    name: String,
    business_url: String,
}

/// Extracts the organic (non-sponsored) businesses from a search payload
///
/// # Failure policy
///
/// If the payload contains no business entries at all, the page is treated as
/// not loaded: [`ExtractError::Challenge`] when the challenge marker is present,
/// [`ExtractError::NotLoaded`] otherwise. A page whose entries are all sponsored
/// loaded fine and yields an empty list.
pub fn extract_search_page(payload: &str, site: &SiteConfig) -> ExtractResult<Vec<BusinessStub>> {
    let entries = scan_entries(payload);

    if entries.is_empty() {
        if payload.contains(&site.challenge_marker) {
            return Err(ExtractError::Challenge);
        }
        return Err(ExtractError::NotLoaded);
    }

    let total = entries.len();
    let stubs: Vec<BusinessStub> = entries
        .into_iter()
        .filter(|entry| !entry.is_ad)
        .map(|entry| BusinessStub {
            biz_id: entry.biz_id,
            ranking: entry.ranking,
            name: entry.name,
            business_url: absolute_business_url(site.base(), &entry.business_url),
        })
        .collect();

    tracing::trace!(
        "Search page: {} entries, {} sponsored dropped",
        total,
        total - stubs.len()
    );

    Ok(stubs)
}

fn scan_entries(payload: &str) -> Vec<RawEntry> {
    BUSINESS_ENTRY
        .captures_iter(payload)
        .filter_map(|caps| {
            let ranking = caps[2].parse().ok()?;
            Some(RawEntry {
                biz_id: caps[1].to_string(),
                ranking,
                is_ad: &caps[3] == "true",
                name: unescape_json_string(&caps[4]),
                business_url: unescape_json_string(&caps[5]),
            })
        })
        .collect()
}

/// Decodes JSON string escapes (`\u0026`, `\/`), keeping the raw text if it
/// is not a well-formed JSON string body
fn unescape_json_string(raw: &str) -> String {
    if !raw.contains('\\') {
        return raw.to_string();
    }
    serde_json::from_str::<String>(&format!("\"{}\"", raw)).unwrap_or_else(|_| raw.to_string())
}
