use std::collections::BTreeMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sarthi_core::domain::price::ObservedPrice;
use sarthi_core::domain::query::Crop;
use sarthi_core::errors::ProviderError;
use sarthi_core::providers::PriceSource;

/// Operator-configured reference prices, used only as the degraded tier.
pub struct ReferencePriceSource {
    prices: BTreeMap<Crop, Decimal>,
    market_name: String,
}

impl ReferencePriceSource {
    pub fn new(prices: BTreeMap<Crop, Decimal>, market_name: String) -> Self {
        Self { prices, market_name }
    }
}

#[async_trait]
impl PriceSource for ReferencePriceSource {
    fn name(&self) -> &str {
        "reference"
    }

    async fn observe(&self, crop: Crop) -> Result<ObservedPrice, ProviderError> {
        let price_per_unit = self.prices.get(&crop).copied().ok_or_else(|| {
            ProviderError::NotConfigured(format!("no reference price for {crop}"))
        })?;
        Ok(ObservedPrice { crop, price_per_unit, market: self.market_name.clone() })
    }
}
