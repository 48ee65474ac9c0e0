use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sarthi_core::domain::price::ObservedPrice;
use sarthi_core::domain::query::Crop;
use sarthi_core::errors::ProviderError;
use sarthi_core::providers::PriceSource;
use scraper::{ElementRef, Html, Selector};

use crate::transport_error;

/// Scrapes the Agmarknet portal's commodity tables.
pub struct AgmarknetPriceSource {
    client: reqwest::Client,
    timeout: Duration,
    url: String,
    market_name: String,
}

impl AgmarknetPriceSource {
    pub fn new(client: reqwest::Client, timeout: Duration, url: String, market_name: String) -> Self {
        Self { client, timeout, url, market_name }
    }
}

#[async_trait]
impl PriceSource for AgmarknetPriceSource {
    fn name(&self) -> &str {
        "agmarknet"
    }

    async fn observe(&self, crop: Crop) -> Result<ObservedPrice, ProviderError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|error| transport_error(error, self.timeout))?;
        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status().as_u16()));
        }
        let html = response.text().await.map_err(|error| transport_error(error, self.timeout))?;
        parse_price_table(&html, crop, &self.market_name)
    }
}

/// Finds the row for `market` and `crop` in any commodity table and reads its
/// modal price, or the first price-looking cell when no modal column exists.
pub fn parse_price_table(
    html: &str,
    crop: Crop,
    market: &str,
) -> Result<ObservedPrice, ProviderError> {
    let document = Html::parse_document(html);
    let table_selector = selector("table")?;
    let header_selector = selector("th")?;
    let row_selector = selector("tr")?;
    let cell_selector = selector("td")?;

    let crop_label = crop.as_str();
    let market_label = market.trim().to_lowercase();

    for table in document.select(&table_selector) {
        let headers =
            table.select(&header_selector).map(|th| cell_text(th).to_lowercase()).collect::<Vec<_>>();
        if !headers.iter().any(|h| h.contains("commodity") || h.contains("variety")) {
            continue;
        }
        let modal_column = headers.iter().position(|h| h.contains("modal"));

        for row in table.select(&row_selector) {
            let cells = row.select(&cell_selector).map(cell_text).collect::<Vec<_>>();
            if cells.len() < 3 {
                continue;
            }
            let row_text = cells.join(" ").to_lowercase();
            if !row_text.contains(&market_label) || !row_text.contains(crop_label) {
                continue;
            }

            // A modal column that cannot be read must not fall through to min/max.
            let price = match modal_column {
                Some(index) => cells.get(index).and_then(|cell| parse_price_cell(cell)),
                None => cells.iter().find_map(|cell| parse_price_cell(cell)),
            };

            return match price {
                Some(price_per_unit) => {
                    Ok(ObservedPrice { crop, price_per_unit, market: market.trim().to_string() })
                }
                None => Err(ProviderError::Malformed(format!(
                    "row for {crop_label} at {market} has no readable modal price"
                ))),
            };
        }
    }

    Err(ProviderError::Malformed(format!("no commodity table row for {crop_label} at {market}")))
}

fn selector(raw: &str) -> Result<Selector, ProviderError> {
    Selector::parse(raw).map_err(|error| ProviderError::Malformed(error.to_string()))
}

fn cell_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Accepts `2275`, `2,275.00` or `₹ 2275`; needs at least two digits.
fn parse_price_cell(cell: &str) -> Option<Decimal> {
    let cleaned =
        cell.chars().filter(|ch| !matches!(ch, ',' | '₹') && !ch.is_whitespace()).collect::<String>();
    if cleaned.chars().filter(char::is_ascii_digit).count() < 2 {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}
