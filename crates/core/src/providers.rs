//! Seams for the external services the pipeline consults.
//!
//! Every call returns a value or an explicit unavailability reason; none of
//! them may substitute a made-up value.

use async_trait::async_trait;

use crate::domain::price::{ObservedPrice, PriceQuote};
use crate::domain::query::{Crop, Query};
use crate::domain::weather::WeatherSnapshot;
use crate::errors::{
    GenerativeUnavailable, PriceUnavailable, ProviderError, TranscriptionUnavailable,
    WeatherUnavailable,
};

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn fetch(&self, location: &str) -> Result<WeatherSnapshot, WeatherUnavailable>;
}

#[async_trait]
pub trait MarketPriceProvider: Send + Sync {
    async fn fetch(&self, crop: Crop) -> Result<PriceQuote, PriceUnavailable>;
}

/// One concrete origin of commodity prices, used as a tier inside a
/// [`MarketPriceProvider`].
#[async_trait]
pub trait PriceSource: Send + Sync {
    fn name(&self) -> &str;

    async fn observe(&self, crop: Crop) -> Result<ObservedPrice, ProviderError>;
}

#[async_trait]
pub trait GenerativeFallback: Send + Sync {
    async fn generate(&self, query: &Query) -> Result<String, GenerativeUnavailable>;
}

/// Speech-to-text for voice notes. Sits in front of the pipeline, which only
/// ever sees the resulting text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    fn name(&self) -> &'static str;

    async fn transcribe(&self, audio: &[u8]) -> Result<String, TranscriptionUnavailable>;
}
