use crate::model::BusinessStub;
use crate::ExtractError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One row of a business's opening-hours table, as literal site text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenHours {
    pub weekday: String,

    /// Unparsed hours text, e.g. "Closed" or "11:00 AM - 3:00 PM"
    #[serde(rename = "open_hours")]
    pub hours_text: String,
}

/// A listed amenity and whether the business offers it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amenity {
    #[serde(rename = "amenity")]
    pub name: String,

    #[serde(rename = "is_available")]
    pub available: bool,
}

/// Price tier: one to four `$` characters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PriceTier(String);

impl PriceTier {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PriceTier {
    type Error = ExtractError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if (1..=4).contains(&value.len()) && value.chars().all(|c| c == '$') {
            Ok(Self(value))
        } else {
            Err(ExtractError::Validation {
                field: "price",
                value,
            })
        }
    }
}

impl TryFrom<&str> for PriceTier {
    type Error = ExtractError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_from(value.to_string())
    }
}

impl From<PriceTier> for String {
    fn from(tier: PriceTier) -> Self {
        tier.0
    }
}

impl fmt::Display for PriceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Health inspection grade: exactly one uppercase ASCII letter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HealthScore(String);

impl HealthScore {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for HealthScore {
    type Error = ExtractError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let mut chars = value.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_uppercase() => Ok(Self(value)),
            _ => Err(ExtractError::Validation {
                field: "health_score",
                value,
            }),
        }
    }
}

impl TryFrom<&str> for HealthScore {
    type Error = ExtractError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_from(value.to_string())
    }
}

impl From<HealthScore> for String {
    fn from(score: HealthScore) -> Self {
        score.0
    }
}

impl fmt::Display for HealthScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fully extracted business detail record
///
/// List fields are always present (empty when the page had nothing); the
/// price tier and health score can only hold values that passed validation.
/// Key names follow the output file consumed by the relational loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessRecord {
    pub name: String,
    pub website: Option<String>,
    pub phone_number: Option<String>,
    pub open_hours: Vec<OpenHours>,
    pub address: Option<String>,
    #[serde(rename = "food_category")]
    pub food_categories: Vec<String>,
    #[serde(rename = "price")]
    pub price_tier: Option<PriceTier>,
    pub health_score: Option<HealthScore>,
    pub amenities: Vec<Amenity>,
    pub highlights: Vec<String>,
    pub related_search_terms: Vec<String>,
}

impl BusinessRecord {
    /// Creates a record with only a name; every other field empty
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            website: None,
            phone_number: None,
            open_hours: Vec::new(),
            address: None,
            food_categories: Vec::new(),
            price_tier: None,
            health_score: None,
            amenities: Vec::new(),
            highlights: Vec::new(),
            related_search_terms: Vec::new(),
        }
    }
}

/// One output line: a detail record tagged with its stub's key and ranking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedBusiness {
    #[serde(rename = "bizId")]
    pub biz_id: String,

    pub ranking: u32,

    #[serde(flatten)]
    pub record: BusinessRecord,
}

impl ScrapedBusiness {
    pub fn new(stub: &BusinessStub, record: BusinessRecord) -> Self {
        Self {
            biz_id: stub.biz_id.clone(),
            ranking: stub.ranking,
            record,
        }
    }
}
