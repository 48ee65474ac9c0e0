use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sarthi_core::domain::price::ObservedPrice;
use sarthi_core::domain::query::Crop;
use sarthi_core::errors::ProviderError;
use sarthi_core::providers::PriceSource;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;

use crate::transport_error;

/// Daily mandi prices from the data.gov.in JSON resource.
pub struct OpenDataPriceSource {
    client: reqwest::Client,
    timeout: Duration,
    url: String,
    api_key: SecretString,
    market_name: String,
}

impl OpenDataPriceSource {
    pub fn new(
        client: reqwest::Client,
        timeout: Duration,
        url: String,
        api_key: SecretString,
        market_name: String,
    ) -> Self {
        Self { client, timeout, url, api_key, market_name }
    }
}

#[async_trait]
impl PriceSource for OpenDataPriceSource {
    fn name(&self) -> &str {
        "open_data"
    }

    async fn observe(&self, crop: Crop) -> Result<ObservedPrice, ProviderError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("api-key", self.api_key.expose_secret()),
                ("format", "json"),
                ("limit", "50"),
                ("filters[commodity]", commodity_name(crop)),
            ])
            .send()
            .await
            .map_err(|error| transport_error(error, self.timeout))?;

        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status().as_u16()));
        }

        let body = response.text().await.map_err(|error| transport_error(error, self.timeout))?;
        parse_records(&body, crop, &self.market_name)
    }
}

#[derive(Debug, Deserialize)]
struct RecordsResponse {
    #[serde(default)]
    records: Vec<Record>,
}

#[derive(Debug, Deserialize)]
struct Record {
    #[serde(default)]
    market: String,
    #[serde(default)]
    commodity: String,
    modal_price: Option<Value>,
}

pub fn parse_records(body: &str, crop: Crop, market: &str) -> Result<ObservedPrice, ProviderError> {
    let response: RecordsResponse =
        serde_json::from_str(body).map_err(|error| ProviderError::Malformed(error.to_string()))?;

    let market_label = market.trim().to_lowercase();
    let record = response
        .records
        .iter()
        .find(|record| {
            record.commodity.to_lowercase().starts_with(crop.as_str())
                && record.market.to_lowercase().contains(&market_label)
        })
        .ok_or_else(|| {
            ProviderError::Malformed(format!("no open data record for {crop} at {market}"))
        })?;

    let price_per_unit = record.modal_price.as_ref().and_then(decimal_from_json).ok_or_else(|| {
        ProviderError::Malformed(format!("record for {crop} at {market} has no modal price"))
    })?;

    Ok(ObservedPrice { crop, price_per_unit, market: market.trim().to_string() })
}

fn decimal_from_json(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(raw) => Decimal::from_str(raw.trim()).ok(),
        Value::Number(number) => Decimal::from_str(&number.to_string()).ok(),
        _ => None,
    }
}

fn commodity_name(crop: Crop) -> &'static str {
    match crop {
        Crop::Wheat => "Wheat",
        Crop::Mustard => "Mustard",
        Crop::Unknown => "",
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use sarthi_core::domain::query::Crop;
    use sarthi_core::errors::ProviderError;

    use super::parse_records;

    #[test]
    fn string_and_numeric_modal_prices_are_accepted() {
        let body = r#"{"records": [
            {"market": "Kota", "commodity": "Wheat", "modal_price": "2210"},
            {"market": "Jaipur (F&V)", "commodity": "Wheat", "modal_price": "2265"},
            {"market": "Jaipur (F&V)", "commodity": "Mustard", "modal_price": 5380}
        ]}"#;

        let wheat = parse_records(body, Crop::Wheat, "Jaipur").expect("wheat");
        assert_eq!(wheat.price_per_unit, Decimal::new(2265, 0));

        let mustard = parse_records(body, Crop::Mustard, "Jaipur").expect("mustard");
        assert_eq!(mustard.price_per_unit, Decimal::new(5380, 0));
    }

    #[test]
    fn empty_record_list_is_malformed() {
        let error = parse_records(r#"{"records": []}"#, Crop::Wheat, "Jaipur").expect_err("empty");
        assert!(matches!(error, ProviderError::Malformed(_)));
    }

    #[test]
    fn missing_modal_price_is_malformed() {
        let body = r#"{"records": [{"market": "Jaipur", "commodity": "Mustard", "modal_price": "NR"}]}"#;
        let error = parse_records(body, Crop::Mustard, "Jaipur").expect_err("not a number");
        assert!(matches!(error, ProviderError::Malformed(ref message) if message.contains("modal")));
    }
}
