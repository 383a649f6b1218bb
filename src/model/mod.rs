//! Data model for harvested businesses
//!
//! # Components
//!
//! - `BusinessStub`: the discovery-phase record (identifier, ranking, name, URL)
//! - `BusinessRecord`: the fully extracted detail record
//! - `ScrapedBusiness`: a detail record tagged with its stub's identifier and ranking,
//!   as written to the output sink
//! - `PriceTier` / `HealthScore`: validated field types

mod record;
mod stub;

pub use record::{Amenity, BusinessRecord, HealthScore, OpenHours, PriceTier, ScrapedBusiness};
pub use stub::BusinessStub;
