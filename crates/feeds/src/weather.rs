use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sarthi_core::config::WeatherConfig;
use sarthi_core::domain::weather::WeatherSnapshot;
use sarthi_core::errors::{ProviderError, WeatherUnavailable};
use sarthi_core::providers::WeatherProvider;
use serde::Deserialize;
use tracing::debug;

use crate::transport_error;

const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,wind_speed_10m";
const DAILY_FIELDS: &str = "precipitation_probability_max";

/// Open-Meteo forecast client pinned to the configured coordinates.
///
/// The free-form location only labels the snapshot; no geocoding happens.
pub struct OpenMeteoWeatherProvider {
    client: reqwest::Client,
    base_url: String,
    latitude: f64,
    longitude: f64,
    timezone: String,
    timeout: Duration,
}

impl OpenMeteoWeatherProvider {
    pub fn new(client: reqwest::Client, config: &WeatherConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            latitude: config.latitude,
            longitude: config.longitude,
            timezone: config.timezone.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    async fn fetch_forecast(&self) -> Result<ForecastResponse, ProviderError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("latitude", self.latitude.to_string()),
                ("longitude", self.longitude.to_string()),
                ("current", CURRENT_FIELDS.to_string()),
                ("daily", DAILY_FIELDS.to_string()),
                ("forecast_days", "1".to_string()),
                ("timezone", self.timezone.clone()),
            ])
            .send()
            .await
            .map_err(|error| transport_error(error, self.timeout))?;

        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status().as_u16()));
        }

        let body = response.text().await.map_err(|error| transport_error(error, self.timeout))?;
        serde_json::from_str(&body).map_err(|error| ProviderError::Malformed(error.to_string()))
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoWeatherProvider {
    async fn fetch(&self, location: &str) -> Result<WeatherSnapshot, WeatherUnavailable> {
        let forecast = self.fetch_forecast().await?;
        let snapshot = snapshot_from_forecast(forecast, location)?;
        debug!(
            event_name = "feeds.weather.fetched",
            location = %snapshot.location,
            temperature_c = snapshot.temperature_c,
            precipitation_probability = snapshot.precipitation_probability,
            "weather snapshot fetched"
        );
        Ok(snapshot)
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: Option<CurrentBlock>,
    daily: Option<DailyBlock>,
}

#[derive(Debug, Deserialize)]
struct CurrentBlock {
    temperature_2m: Option<f64>,
    relative_humidity_2m: Option<f64>,
    wind_speed_10m: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct DailyBlock {
    #[serde(default)]
    precipitation_probability_max: Vec<Option<f64>>,
}

fn snapshot_from_forecast(
    forecast: ForecastResponse,
    location: &str,
) -> Result<WeatherSnapshot, ProviderError> {
    let current = forecast
        .current
        .ok_or_else(|| ProviderError::Malformed("forecast has no `current` block".to_string()))?;
    let temperature_c = current
        .temperature_2m
        .filter(|value| value.is_finite())
        .ok_or_else(|| ProviderError::Malformed("forecast has no current temperature".to_string()))?;
    let precipitation = forecast
        .daily
        .and_then(|daily| daily.precipitation_probability_max.into_iter().next().flatten())
        .ok_or_else(|| {
            ProviderError::Malformed("forecast has no precipitation probability".to_string())
        })?;

    Ok(WeatherSnapshot {
        location: location.to_string(),
        temperature_c,
        precipitation_probability: percent(precipitation),
        wind_speed_kmh: current.wind_speed_10m.filter(|value| value.is_finite()),
        relative_humidity: current.relative_humidity_2m.map(percent),
        fetched_at: Utc::now(),
    })
}

fn percent(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use sarthi_core::errors::ProviderError;

    use super::{snapshot_from_forecast, ForecastResponse};

    fn forecast(raw: &str) -> ForecastResponse {
        serde_json::from_str(raw).expect("fixture json")
    }

    #[test]
    fn full_forecast_maps_to_snapshot() {
        let snapshot = snapshot_from_forecast(
            forecast(
                r#"{
                    "current": {"temperature_2m": 31.4, "relative_humidity_2m": 38, "wind_speed_10m": 9.7},
                    "daily": {"time": ["2026-10-19"], "precipitation_probability_max": [65]}
                }"#,
            ),
            "Jaipur, Rajasthan",
        )
        .expect("snapshot");

        assert_eq!(snapshot.location, "Jaipur, Rajasthan");
        assert_eq!(snapshot.temperature_c, 31.4);
        assert_eq!(snapshot.precipitation_probability, 65);
        assert_eq!(snapshot.relative_humidity, Some(38));
        assert_eq!(snapshot.wind_speed_kmh, Some(9.7));
        assert!(snapshot.rain_likely());
    }

    #[test]
    fn missing_temperature_is_malformed_not_zero() {
        let error = snapshot_from_forecast(
            forecast(
                r#"{"current": {"relative_humidity_2m": 38},
                    "daily": {"precipitation_probability_max": [10]}}"#,
            ),
            "Jaipur",
        )
        .expect_err("no temperature");

        assert!(matches!(error, ProviderError::Malformed(ref message) if message.contains("temperature")));
    }

    #[test]
    fn null_precipitation_is_malformed() {
        let error = snapshot_from_forecast(
            forecast(
                r#"{"current": {"temperature_2m": 20.0},
                    "daily": {"precipitation_probability_max": [null]}}"#,
            ),
            "Jaipur",
        )
        .expect_err("no precipitation");

        assert!(matches!(error, ProviderError::Malformed(_)));
    }

    #[test]
    fn optional_fields_may_be_absent() {
        let snapshot = snapshot_from_forecast(
            forecast(
                r#"{"current": {"temperature_2m": 18.0},
                    "daily": {"precipitation_probability_max": [120]}}"#,
            ),
            "Jaipur",
        )
        .expect("snapshot");

        assert_eq!(snapshot.precipitation_probability, 100);
        assert_eq!(snapshot.wind_speed_kmh, None);
        assert_eq!(snapshot.relative_humidity, None);
    }
}
