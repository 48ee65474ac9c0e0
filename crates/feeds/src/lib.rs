//! HTTP-backed weather and mandi price providers.

pub mod agmarknet;
pub mod open_data;
pub mod reference;
pub mod weather;

use std::sync::Arc;
use std::time::Duration;

use sarthi_core::config::{AppConfig, SecondaryPriceSource};
use sarthi_core::errors::ProviderError;
use sarthi_core::market::TieredMarketPriceProvider;
use sarthi_core::providers::PriceSource;
use secrecy::ExposeSecret;
use thiserror::Error;

pub use agmarknet::AgmarknetPriceSource;
pub use open_data::OpenDataPriceSource;
pub use reference::ReferencePriceSource;
pub use weather::OpenMeteoWeatherProvider;

const USER_AGENT: &str = concat!("agri-sarthi/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("could not build http client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("feed is misconfigured: {0}")]
    Config(String),
}

pub fn http_client(timeout: Duration) -> Result<reqwest::Client, FeedError> {
    Ok(reqwest::Client::builder().timeout(timeout).user_agent(USER_AGENT).build()?)
}

pub fn build_weather_provider(config: &AppConfig) -> Result<OpenMeteoWeatherProvider, FeedError> {
    let timeout = bounded_timeout(config.weather.timeout_secs, config);
    Ok(OpenMeteoWeatherProvider::new(http_client(timeout)?, &config.weather))
}

/// Agmarknet first, then the configured secondary source.
pub fn build_price_provider(config: &AppConfig) -> Result<TieredMarketPriceProvider, FeedError> {
    let market = &config.market;
    let per_tier = bounded_timeout(market.timeout_secs, config);
    let client = http_client(per_tier)?;

    let primary: Arc<dyn PriceSource> = Arc::new(AgmarknetPriceSource::new(
        client.clone(),
        per_tier,
        market.primary_url.clone(),
        market.market_name.clone(),
    ));

    let secondary: Arc<dyn PriceSource> = match market.secondary {
        SecondaryPriceSource::OpenData => {
            let url = market.secondary_url.clone().ok_or_else(|| {
                FeedError::Config("market.secondary_url is required for open_data".to_string())
            })?;
            let api_key = market
                .secondary_api_key
                .clone()
                .filter(|key| !key.expose_secret().trim().is_empty())
                .ok_or_else(|| {
                    FeedError::Config(
                        "market.secondary_api_key is required for open_data".to_string(),
                    )
                })?;
            Arc::new(OpenDataPriceSource::new(
                client,
                per_tier,
                url,
                api_key,
                market.market_name.clone(),
            ))
        }
        SecondaryPriceSource::Reference => Arc::new(ReferencePriceSource::new(
            market.reference_prices.clone(),
            market.market_name.clone(),
        )),
    };

    Ok(TieredMarketPriceProvider::new(primary, secondary, per_tier))
}

/// The per-source timeout, never longer than the pipeline's call ceiling.
fn bounded_timeout(source_secs: u64, config: &AppConfig) -> Duration {
    Duration::from_secs(source_secs).min(config.pipeline.call_timeout())
}

pub(crate) fn transport_error(error: reqwest::Error, timeout: Duration) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Timeout { after_ms: timeout.as_millis() as u64 }
    } else if let Some(status) = error.status() {
        ProviderError::Status(status.as_u16())
    } else if error.is_decode() {
        ProviderError::Malformed(error.to_string())
    } else {
        ProviderError::Network(error.to_string())
    }
}
