use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::query::Crop;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSourceTier {
    Primary,
    /// Secondary source; quotes from it carry degraded confidence.
    Fallback,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub crop: Crop,
    pub price_per_unit: Decimal,
    pub unit: String,
    pub market: String,
    pub source: PriceSourceTier,
    pub fetched_at: DateTime<Utc>,
}

impl PriceQuote {
    pub fn is_degraded(&self) -> bool {
        self.source == PriceSourceTier::Fallback
    }
}

/// A price as reported by one concrete source, before the tiered provider
/// validates it and stamps the tier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObservedPrice {
    pub crop: Crop,
    pub price_per_unit: Decimal,
    pub market: String,
}

pub const PRICE_UNIT_QUINTAL: &str = "quintal";
