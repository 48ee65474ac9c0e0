use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use sarthi_core::config::{AppConfig, LoadOptions};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let reference_prices = config
        .market
        .reference_prices
        .iter()
        .map(|(crop, price)| format!("{crop}={price}"))
        .collect::<Vec<_>>()
        .join(", ");

    let fields: Vec<(&str, String, &str)> = vec![
        ("database.url", config.database.url.clone(), "SARTHI_DATABASE_URL"),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            "SARTHI_DATABASE_MAX_CONNECTIONS",
        ),
        ("weather.base_url", config.weather.base_url.clone(), "SARTHI_WEATHER_BASE_URL"),
        (
            "weather.coordinates",
            format!("{}, {}", config.weather.latitude, config.weather.longitude),
            "SARTHI_WEATHER_LATITUDE",
        ),
        ("market.primary_url", config.market.primary_url.clone(), "SARTHI_MARKET_PRIMARY_URL"),
        ("market.market_name", config.market.market_name.clone(), "SARTHI_MARKET_NAME"),
        ("market.secondary", format!("{:?}", config.market.secondary), "SARTHI_MARKET_SECONDARY"),
        (
            "market.secondary_api_key",
            redact_secret(config.market.secondary_api_key.as_ref()),
            "SARTHI_MARKET_SECONDARY_API_KEY",
        ),
        ("market.reference_prices", reference_prices, ""),
        ("llm.provider", format!("{:?}", config.llm.provider), "SARTHI_LLM_PROVIDER"),
        ("llm.base_url", config.llm.base_url.clone(), "SARTHI_LLM_BASE_URL"),
        ("llm.model", config.llm.model.clone(), "SARTHI_LLM_MODEL"),
        (
            "transcription.provider",
            format!("{:?}", config.transcription.provider),
            "SARTHI_TRANSCRIPTION_PROVIDER",
        ),
        (
            "transcription.base_url",
            config.transcription.base_url.clone(),
            "SARTHI_TRANSCRIPTION_BASE_URL",
        ),
        (
            "pipeline.call_timeout_ms",
            config.pipeline.call_timeout_ms.to_string(),
            "SARTHI_PIPELINE_CALL_TIMEOUT_MS",
        ),
        (
            "pipeline.default_location",
            config.pipeline.default_location.clone(),
            "SARTHI_PIPELINE_DEFAULT_LOCATION",
        ),
        ("server.bind_address", config.server.bind_address.clone(), "SARTHI_SERVER_BIND_ADDRESS"),
        ("server.port", config.server.port.to_string(), "SARTHI_SERVER_PORT"),
        (
            "delivery.gateway_url",
            config.delivery.gateway_url.clone().unwrap_or_else(|| "<unset>".to_string()),
            "SARTHI_DELIVERY_GATEWAY_URL",
        ),
        (
            "delivery.gateway_token",
            redact_secret(config.delivery.gateway_token.as_ref()),
            "SARTHI_DELIVERY_GATEWAY_TOKEN",
        ),
        ("logging.level", config.logging.level.clone(), "SARTHI_LOGGING_LEVEL"),
        ("logging.format", format!("{:?}", config.logging.format), "SARTHI_LOGGING_FORMAT"),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_key) in &fields {
        let env_key = (!env_key.is_empty()).then_some(*env_key);
        lines.push(render_line(
            key,
            value,
            field_source(key, env_key, config_file_doc.as_ref(), config_file_path.as_deref()),
        ));
    }

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    ["sarthi.toml", "config/sarthi.toml"].into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_secret(secret: Option<&SecretString>) -> String {
    match secret.map(|value| value.expose_secret().trim().len()) {
        None => "<unset>".to_string(),
        Some(0) => "<empty>".to_string(),
        Some(_) => "<redacted>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use toml::Value;

    use super::{contains_path, redact_secret};

    #[test]
    fn secrets_are_never_rendered() {
        let secret = SecretString::from("data-gov-key-123".to_string());
        assert_eq!(redact_secret(Some(&secret)), "<redacted>");
        assert_eq!(redact_secret(None), "<unset>");
    }

    #[test]
    fn nested_keys_are_found_in_file_document() {
        let doc = "[market]\nsecondary = \"reference\"\n".parse::<Value>().expect("toml");
        assert!(contains_path(&doc, "market.secondary"));
        assert!(!contains_path(&doc, "market.primary_url"));
    }
}
