use serde::{Deserialize, Serialize};

/// A business found on a search results page, before detail extraction
///
/// Serialized with the checkpoint's key names (`bizId`, `businessUrl`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessStub {
    /// Site-assigned identifier; the dedup key across both phases
    #[serde(rename = "bizId")]
    pub biz_id: String,

    /// Position within its search page
    pub ranking: u32,

    pub name: String,

    /// Fully qualified detail page URL without a query string
    #[serde(rename = "businessUrl")]
    pub business_url: String,
}
