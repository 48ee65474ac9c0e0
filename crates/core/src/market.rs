use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::domain::price::{ObservedPrice, PriceQuote, PriceSourceTier, PRICE_UNIT_QUINTAL};
use crate::domain::query::Crop;
use crate::errors::{PriceUnavailable, ProviderError};
use crate::providers::{MarketPriceProvider, PriceSource};

/// Primary-then-secondary price lookup.
///
/// Each tier gets one attempt bounded by `per_call_timeout`. A tier only counts
/// as successful when it reports a positive price for the requested crop.
pub struct TieredMarketPriceProvider {
    primary: Arc<dyn PriceSource>,
    secondary: Arc<dyn PriceSource>,
    per_call_timeout: Duration,
}

impl TieredMarketPriceProvider {
    pub fn new(
        primary: Arc<dyn PriceSource>,
        secondary: Arc<dyn PriceSource>,
        per_call_timeout: Duration,
    ) -> Self {
        Self { primary, secondary, per_call_timeout }
    }

    pub fn primary_name(&self) -> &str {
        self.primary.name()
    }

    pub fn secondary_name(&self) -> &str {
        self.secondary.name()
    }

    async fn observe_tier(
        &self,
        source: &dyn PriceSource,
        crop: Crop,
    ) -> Result<ObservedPrice, ProviderError> {
        let observed = match tokio::time::timeout(self.per_call_timeout, source.observe(crop)).await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(ProviderError::Timeout {
                    after_ms: self.per_call_timeout.as_millis() as u64,
                })
            }
        };
        validate_observation(&observed, crop)?;
        Ok(observed)
    }
}

#[async_trait]
impl MarketPriceProvider for TieredMarketPriceProvider {
    async fn fetch(&self, crop: Crop) -> Result<PriceQuote, PriceUnavailable> {
        if !crop.is_known() {
            return Err(PriceUnavailable::UnsupportedCrop(crop.to_string()));
        }

        let primary_error = match self.observe_tier(self.primary.as_ref(), crop).await {
            Ok(observed) => {
                debug!(
                    event_name = "market.price.primary_hit",
                    source = self.primary.name(),
                    crop = %crop,
                    price = %observed.price_per_unit,
                    "primary price source answered"
                );
                return Ok(into_quote(observed, PriceSourceTier::Primary));
            }
            Err(error) => error,
        };

        warn!(
            event_name = "market.price.primary_failed",
            source = self.primary.name(),
            crop = %crop,
            error_class = primary_error.class(),
            error = %primary_error,
            "primary price source failed, trying secondary"
        );

        match self.observe_tier(self.secondary.as_ref(), crop).await {
            Ok(observed) => Ok(into_quote(observed, PriceSourceTier::Fallback)),
            Err(secondary_error) => {
                warn!(
                    event_name = "market.price.secondary_failed",
                    source = self.secondary.name(),
                    crop = %crop,
                    error_class = secondary_error.class(),
                    error = %secondary_error,
                    "secondary price source failed"
                );
                Err(PriceUnavailable::Exhausted {
                    primary: primary_error,
                    secondary: secondary_error,
                })
            }
        }
    }
}

pub fn validate_observation(observed: &ObservedPrice, requested: Crop) -> Result<(), ProviderError> {
    if observed.crop != requested {
        return Err(ProviderError::Malformed(format!(
            "source reported {} while {} was requested",
            observed.crop, requested
        )));
    }
    if observed.price_per_unit <= Decimal::ZERO {
        return Err(ProviderError::Malformed(format!(
            "non-positive price {} for {}",
            observed.price_per_unit, requested
        )));
    }
    Ok(())
}

fn into_quote(observed: ObservedPrice, source: PriceSourceTier) -> PriceQuote {
    PriceQuote {
        crop: observed.crop,
        price_per_unit: observed.price_per_unit,
        unit: PRICE_UNIT_QUINTAL.to_string(),
        market: observed.market,
        source,
        fetched_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use super::TieredMarketPriceProvider;
    use crate::domain::price::{ObservedPrice, PriceSourceTier};
    use crate::domain::query::Crop;
    use crate::errors::{PriceUnavailable, ProviderError};
    use crate::providers::{MarketPriceProvider, PriceSource};

    enum Behaviour {
        Price(Crop, i64),
        Fail(ProviderError),
        Hang,
    }

    struct FakeSource {
        name: &'static str,
        behaviour: Behaviour,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn new(name: &'static str, behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self { name, behaviour, calls: AtomicUsize::new(0) })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PriceSource for FakeSource {
        fn name(&self) -> &str {
            self.name
        }

        async fn observe(&self, _crop: Crop) -> Result<ObservedPrice, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behaviour {
                Behaviour::Price(crop, rupees) => Ok(ObservedPrice {
                    crop: *crop,
                    price_per_unit: Decimal::new(*rupees, 0),
                    market: "Jaipur (F&V)".to_string(),
                }),
                Behaviour::Fail(error) => Err(error.clone()),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Err(ProviderError::Network("unreachable".to_string()))
                }
            }
        }
    }

    fn provider(primary: Arc<FakeSource>, secondary: Arc<FakeSource>) -> TieredMarketPriceProvider {
        TieredMarketPriceProvider::new(primary, secondary, Duration::from_millis(50))
    }

    #[tokio::test]
    async fn primary_success_skips_secondary() {
        let primary = FakeSource::new("agmarknet", Behaviour::Price(Crop::Wheat, 2275));
        let secondary = FakeSource::new("open_data", Behaviour::Price(Crop::Wheat, 2200));

        let quote = provider(primary.clone(), secondary.clone())
            .fetch(Crop::Wheat)
            .await
            .expect("primary quote");

        assert_eq!(quote.source, PriceSourceTier::Primary);
        assert_eq!(quote.price_per_unit, Decimal::new(2275, 0));
        assert_eq!(quote.unit, "quintal");
        assert!(!quote.is_degraded());
        assert_eq!(secondary.calls(), 0);
    }

    #[tokio::test]
    async fn malformed_primary_falls_back_with_degraded_tier() {
        let primary = FakeSource::new(
            "agmarknet",
            Behaviour::Fail(ProviderError::Malformed("no commodity table".to_string())),
        );
        let secondary = FakeSource::new("open_data", Behaviour::Price(Crop::Mustard, 5400));

        let quote =
            provider(primary, secondary.clone()).fetch(Crop::Mustard).await.expect("fallback");

        assert_eq!(quote.source, PriceSourceTier::Fallback);
        assert!(quote.is_degraded());
        assert_eq!(quote.price_per_unit, Decimal::new(5400, 0));
        assert_eq!(secondary.calls(), 1);
    }

    #[tokio::test]
    async fn zero_price_from_primary_is_not_accepted() {
        let primary = FakeSource::new("agmarknet", Behaviour::Price(Crop::Wheat, 0));
        let secondary = FakeSource::new("open_data", Behaviour::Price(Crop::Wheat, 2200));

        let quote = provider(primary, secondary).fetch(Crop::Wheat).await.expect("fallback");
        assert_eq!(quote.source, PriceSourceTier::Fallback);
    }

    #[tokio::test]
    async fn crop_mismatch_counts_as_validation_failure() {
        let primary = FakeSource::new("agmarknet", Behaviour::Price(Crop::Mustard, 5400));
        let secondary = FakeSource::new("open_data", Behaviour::Price(Crop::Mustard, 5300));

        let error = provider(primary, secondary).fetch(Crop::Wheat).await.expect_err("mismatch");

        match error {
            PriceUnavailable::Exhausted { primary, secondary } => {
                assert!(matches!(primary, ProviderError::Malformed(_)));
                assert!(matches!(secondary, ProviderError::Malformed(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn both_tiers_failing_yields_unavailable_not_zero() {
        let primary = FakeSource::new("agmarknet", Behaviour::Fail(ProviderError::Status(503)));
        let secondary =
            FakeSource::new("open_data", Behaviour::Fail(ProviderError::Network("dns".to_string())));

        let error = provider(primary, secondary).fetch(Crop::Wheat).await.expect_err("exhausted");

        assert_eq!(
            error,
            PriceUnavailable::Exhausted {
                primary: ProviderError::Status(503),
                secondary: ProviderError::Network("dns".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn hanging_primary_times_out_and_secondary_answers() {
        let primary = FakeSource::new("agmarknet", Behaviour::Hang);
        let secondary = FakeSource::new("open_data", Behaviour::Price(Crop::Wheat, 2210));

        let quote = provider(primary, secondary).fetch(Crop::Wheat).await.expect("fallback");
        assert_eq!(quote.source, PriceSourceTier::Fallback);
    }

    #[tokio::test]
    async fn unknown_crop_fails_without_touching_sources() {
        let primary = FakeSource::new("agmarknet", Behaviour::Price(Crop::Wheat, 2275));
        let secondary = FakeSource::new("open_data", Behaviour::Price(Crop::Wheat, 2200));

        let error = provider(primary.clone(), secondary.clone())
            .fetch(Crop::Unknown)
            .await
            .expect_err("unknown crop");

        assert_eq!(error, PriceUnavailable::UnsupportedCrop("unknown".to_string()));
        assert_eq!(primary.calls() + secondary.calls(), 0);
    }
}
