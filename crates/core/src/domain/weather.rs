use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub location: String,
    pub temperature_c: f64,
    /// Percent chance of precipitation for the current hour, 0..=100.
    pub precipitation_probability: u8,
    pub wind_speed_kmh: Option<f64>,
    pub relative_humidity: Option<u8>,
    pub fetched_at: DateTime<Utc>,
}

impl WeatherSnapshot {
    pub fn rain_likely(&self) -> bool {
        self.precipitation_probability >= RAIN_LIKELY_THRESHOLD_PCT
    }
}

pub const RAIN_LIKELY_THRESHOLD_PCT: u8 = 60;
