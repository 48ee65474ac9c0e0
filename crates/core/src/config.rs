use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::query::Crop;
use crate::pipeline::PipelineSettings;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub weather: WeatherConfig,
    pub market: MarketConfig,
    pub llm: LlmConfig,
    pub transcription: TranscriptionConfig,
    pub pipeline: PipelineConfig,
    pub intent: IntentConfig,
    pub server: ServerConfig,
    pub delivery: DeliveryConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct WeatherConfig {
    pub base_url: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct MarketConfig {
    pub primary_url: String,
    pub market_name: String,
    pub secondary: SecondaryPriceSource,
    pub secondary_url: Option<String>,
    pub secondary_api_key: Option<SecretString>,
    pub reference_prices: BTreeMap<Crop, Decimal>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_prompt_chars: usize,
}

#[derive(Clone, Debug)]
pub struct TranscriptionConfig {
    pub provider: TranscriptionProvider,
    pub base_url: String,
    pub language: String,
    pub timeout_secs: u64,
    pub max_audio_bytes: usize,
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub call_timeout_ms: u64,
    pub default_location: String,
}

#[derive(Clone, Debug, Default)]
pub struct IntentConfig {
    pub keywords_path: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug, Default)]
pub struct DeliveryConfig {
    pub gateway_url: Option<String>,
    pub gateway_token: Option<SecretString>,
    pub sender_id: Option<String>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Ollama,
    Disabled,
}

/// `whisper_cpp` speaks the whisper.cpp server's `/inference` endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptionProvider {
    WhisperCpp,
    Disabled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecondaryPriceSource {
    OpenData,
    Reference,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub call_timeout_ms: Option<u64>,
    pub keywords_path: Option<PathBuf>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

pub const JAIPUR_LATITUDE: f64 = 26.9124;
pub const JAIPUR_LONGITUDE: f64 = 75.7873;

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://sarthi.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            weather: WeatherConfig {
                base_url: "https://api.open-meteo.com/v1/forecast".to_string(),
                latitude: JAIPUR_LATITUDE,
                longitude: JAIPUR_LONGITUDE,
                timezone: "Asia/Kolkata".to_string(),
                timeout_secs: 10,
            },
            market: MarketConfig {
                primary_url: "https://agmarknet.gov.in/".to_string(),
                market_name: "Jaipur".to_string(),
                secondary: SecondaryPriceSource::Reference,
                secondary_url: None,
                secondary_api_key: None,
                reference_prices: BTreeMap::from([
                    (Crop::Wheat, Decimal::new(2200, 0)),
                    (Crop::Mustard, Decimal::new(5400, 0)),
                ]),
                timeout_secs: 10,
            },
            llm: LlmConfig {
                provider: LlmProvider::Ollama,
                base_url: "http://localhost:11434".to_string(),
                model: "mistral".to_string(),
                timeout_secs: 30,
                max_prompt_chars: 2_000,
            },
            transcription: TranscriptionConfig {
                provider: TranscriptionProvider::Disabled,
                base_url: "http://localhost:8080".to_string(),
                language: "hi".to_string(),
                timeout_secs: 60,
                max_audio_bytes: 16 * 1024 * 1024,
            },
            pipeline: PipelineConfig {
                call_timeout_ms: 30_000,
                default_location: crate::pipeline::DEFAULT_LOCATION.to_string(),
            },
            intent: IntentConfig::default(),
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8000,
                graceful_shutdown_secs: 15,
            },
            delivery: DeliveryConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "disabled" | "none" => Ok(Self::Disabled),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected ollama|disabled)"
            ))),
        }
    }
}

impl std::str::FromStr for TranscriptionProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "whisper_cpp" | "whisper" => Ok(Self::WhisperCpp),
            "disabled" | "none" => Ok(Self::Disabled),
            other => Err(ConfigError::Validation(format!(
                "unsupported transcription provider `{other}` (expected whisper_cpp|disabled)"
            ))),
        }
    }
}

impl std::str::FromStr for SecondaryPriceSource {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open_data" => Ok(Self::OpenData),
            "reference" => Ok(Self::Reference),
            other => Err(ConfigError::Validation(format!(
                "unsupported secondary price source `{other}` (expected open_data|reference)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl PipelineConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn settings(&self) -> PipelineSettings {
        PipelineSettings {
            call_timeout: self.call_timeout(),
            default_location: self.default_location.clone(),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("sarthi.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(weather) = patch.weather {
            if let Some(base_url) = weather.base_url {
                self.weather.base_url = base_url;
            }
            if let Some(latitude) = weather.latitude {
                self.weather.latitude = latitude;
            }
            if let Some(longitude) = weather.longitude {
                self.weather.longitude = longitude;
            }
            if let Some(timezone) = weather.timezone {
                self.weather.timezone = timezone;
            }
            if let Some(timeout_secs) = weather.timeout_secs {
                self.weather.timeout_secs = timeout_secs;
            }
        }

        if let Some(market) = patch.market {
            if let Some(primary_url) = market.primary_url {
                self.market.primary_url = primary_url;
            }
            if let Some(market_name) = market.market_name {
                self.market.market_name = market_name;
            }
            if let Some(secondary) = market.secondary {
                self.market.secondary = secondary;
            }
            if let Some(secondary_url) = market.secondary_url {
                self.market.secondary_url = Some(secondary_url);
            }
            if let Some(secondary_api_key_value) = market.secondary_api_key {
                self.market.secondary_api_key = Some(secret_value(secondary_api_key_value));
            }
            if let Some(reference_prices) = market.reference_prices {
                // Unrecognized crop names land on `Crop::Unknown` and fail validation.
                self.market.reference_prices.extend(reference_prices.into_iter().map(
                    |(crop, price)| (Crop::parse(&crop).unwrap_or(Crop::Unknown), price),
                ));
            }
            if let Some(timeout_secs) = market.timeout_secs {
                self.market.timeout_secs = timeout_secs;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_prompt_chars) = llm.max_prompt_chars {
                self.llm.max_prompt_chars = max_prompt_chars;
            }
        }

        if let Some(transcription) = patch.transcription {
            if let Some(provider) = transcription.provider {
                self.transcription.provider = provider;
            }
            if let Some(base_url) = transcription.base_url {
                self.transcription.base_url = base_url;
            }
            if let Some(language) = transcription.language {
                self.transcription.language = language;
            }
            if let Some(timeout_secs) = transcription.timeout_secs {
                self.transcription.timeout_secs = timeout_secs;
            }
            if let Some(max_audio_bytes) = transcription.max_audio_bytes {
                self.transcription.max_audio_bytes = max_audio_bytes;
            }
        }

        if let Some(pipeline) = patch.pipeline {
            if let Some(call_timeout_ms) = pipeline.call_timeout_ms {
                self.pipeline.call_timeout_ms = call_timeout_ms;
            }
            if let Some(default_location) = pipeline.default_location {
                self.pipeline.default_location = default_location;
            }
        }

        if let Some(intent) = patch.intent {
            if let Some(keywords_path) = intent.keywords_path {
                self.intent.keywords_path = Some(keywords_path);
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(delivery) = patch.delivery {
            if let Some(gateway_url) = delivery.gateway_url {
                self.delivery.gateway_url = Some(gateway_url);
            }
            if let Some(gateway_token_value) = delivery.gateway_token {
                self.delivery.gateway_token = Some(secret_value(gateway_token_value));
            }
            if let Some(sender_id) = delivery.sender_id {
                self.delivery.sender_id = Some(sender_id);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SARTHI_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("SARTHI_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("SARTHI_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("SARTHI_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("SARTHI_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SARTHI_WEATHER_BASE_URL") {
            self.weather.base_url = value;
        }
        if let Some(value) = read_env("SARTHI_WEATHER_LATITUDE") {
            self.weather.latitude = parse_f64("SARTHI_WEATHER_LATITUDE", &value)?;
        }
        if let Some(value) = read_env("SARTHI_WEATHER_LONGITUDE") {
            self.weather.longitude = parse_f64("SARTHI_WEATHER_LONGITUDE", &value)?;
        }
        if let Some(value) = read_env("SARTHI_WEATHER_TIMEZONE") {
            self.weather.timezone = value;
        }
        if let Some(value) = read_env("SARTHI_WEATHER_TIMEOUT_SECS") {
            self.weather.timeout_secs = parse_u64("SARTHI_WEATHER_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SARTHI_MARKET_PRIMARY_URL") {
            self.market.primary_url = value;
        }
        if let Some(value) = read_env("SARTHI_MARKET_NAME") {
            self.market.market_name = value;
        }
        if let Some(value) = read_env("SARTHI_MARKET_SECONDARY") {
            self.market.secondary = value.parse()?;
        }
        if let Some(value) = read_env("SARTHI_MARKET_SECONDARY_URL") {
            self.market.secondary_url = Some(value);
        }
        if let Some(value) = read_env("SARTHI_MARKET_SECONDARY_API_KEY") {
            self.market.secondary_api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("SARTHI_MARKET_TIMEOUT_SECS") {
            self.market.timeout_secs = parse_u64("SARTHI_MARKET_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SARTHI_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("SARTHI_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("SARTHI_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("SARTHI_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("SARTHI_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("SARTHI_LLM_MAX_PROMPT_CHARS") {
            self.llm.max_prompt_chars = parse_usize("SARTHI_LLM_MAX_PROMPT_CHARS", &value)?;
        }

        if let Some(value) = read_env("SARTHI_TRANSCRIPTION_PROVIDER") {
            self.transcription.provider = value.parse()?;
        }
        if let Some(value) = read_env("SARTHI_TRANSCRIPTION_BASE_URL") {
            self.transcription.base_url = value;
        }
        if let Some(value) = read_env("SARTHI_TRANSCRIPTION_LANGUAGE") {
            self.transcription.language = value;
        }
        if let Some(value) = read_env("SARTHI_TRANSCRIPTION_TIMEOUT_SECS") {
            self.transcription.timeout_secs =
                parse_u64("SARTHI_TRANSCRIPTION_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("SARTHI_TRANSCRIPTION_MAX_AUDIO_BYTES") {
            self.transcription.max_audio_bytes =
                parse_usize("SARTHI_TRANSCRIPTION_MAX_AUDIO_BYTES", &value)?;
        }

        if let Some(value) = read_env("SARTHI_PIPELINE_CALL_TIMEOUT_MS") {
            self.pipeline.call_timeout_ms = parse_u64("SARTHI_PIPELINE_CALL_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = read_env("SARTHI_PIPELINE_DEFAULT_LOCATION") {
            self.pipeline.default_location = value;
        }

        if let Some(value) = read_env("SARTHI_INTENT_KEYWORDS_PATH") {
            self.intent.keywords_path = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("SARTHI_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("SARTHI_SERVER_PORT") {
            self.server.port = parse_u16("SARTHI_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("SARTHI_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("SARTHI_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("SARTHI_DELIVERY_GATEWAY_URL") {
            self.delivery.gateway_url = Some(value);
        }
        if let Some(value) = read_env("SARTHI_DELIVERY_GATEWAY_TOKEN") {
            self.delivery.gateway_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("SARTHI_DELIVERY_SENDER_ID") {
            self.delivery.sender_id = Some(value);
        }

        let log_level = read_env("SARTHI_LOGGING_LEVEL").or_else(|| read_env("SARTHI_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SARTHI_LOGGING_FORMAT").or_else(|| read_env("SARTHI_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(bind_address) = overrides.bind_address {
            self.server.bind_address = bind_address;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(call_timeout_ms) = overrides.call_timeout_ms {
            self.pipeline.call_timeout_ms = call_timeout_ms;
        }
        if let Some(keywords_path) = overrides.keywords_path {
            self.intent.keywords_path = Some(keywords_path);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_weather(&self.weather)?;
        validate_market(&self.market)?;
        validate_llm(&self.llm)?;
        validate_transcription(&self.transcription)?;
        validate_pipeline(&self.pipeline)?;
        validate_server(&self.server)?;
        validate_delivery(&self.delivery)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("sarthi.toml"), PathBuf::from("config/sarthi.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_weather(weather: &WeatherConfig) -> Result<(), ConfigError> {
    require_http_url("weather.base_url", &weather.base_url)?;

    if !(-90.0..=90.0).contains(&weather.latitude) {
        return Err(ConfigError::Validation(
            "weather.latitude must be in range -90..=90".to_string(),
        ));
    }
    if !(-180.0..=180.0).contains(&weather.longitude) {
        return Err(ConfigError::Validation(
            "weather.longitude must be in range -180..=180".to_string(),
        ));
    }
    if weather.timezone.trim().is_empty() {
        return Err(ConfigError::Validation(
            "weather.timezone must not be empty (e.g. `Asia/Kolkata`)".to_string(),
        ));
    }
    validate_timeout_secs("weather.timeout_secs", weather.timeout_secs)
}

fn validate_market(market: &MarketConfig) -> Result<(), ConfigError> {
    require_http_url("market.primary_url", &market.primary_url)?;

    if market.market_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "market.market_name must name the mandi to quote (e.g. `Jaipur`)".to_string(),
        ));
    }

    match market.secondary {
        SecondaryPriceSource::OpenData => {
            let url = market.secondary_url.as_deref().unwrap_or_default();
            if url.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "market.secondary_url is required when market.secondary is `open_data`"
                        .to_string(),
                ));
            }
            require_http_url("market.secondary_url", url)?;

            let missing_key = market
                .secondary_api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing_key {
                return Err(ConfigError::Validation(
                    "market.secondary_api_key is required when market.secondary is `open_data`. Get one from https://data.gov.in"
                        .to_string(),
                ));
            }
        }
        SecondaryPriceSource::Reference => {
            for (crop, price) in &market.reference_prices {
                if !crop.is_known() {
                    return Err(ConfigError::Validation(
                        "market.reference_prices may only list wheat or mustard".to_string(),
                    ));
                }
                if *price <= Decimal::ZERO {
                    return Err(ConfigError::Validation(format!(
                        "market.reference_prices.{crop} must be greater than zero"
                    )));
                }
            }
        }
    }

    validate_timeout_secs("market.timeout_secs", market.timeout_secs)
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    validate_timeout_secs("llm.timeout_secs", llm.timeout_secs)?;

    match llm.provider {
        LlmProvider::Ollama => {
            if llm.base_url.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "llm.base_url is required for ollama provider".to_string(),
                ));
            }
            require_http_url("llm.base_url", &llm.base_url)?;
            if llm.model.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "llm.model is required for ollama provider (e.g. `mistral`)".to_string(),
                ));
            }
        }
        LlmProvider::Disabled => {}
    }

    if llm.max_prompt_chars < 64 {
        return Err(ConfigError::Validation(
            "llm.max_prompt_chars must be at least 64".to_string(),
        ));
    }

    Ok(())
}

fn validate_transcription(transcription: &TranscriptionConfig) -> Result<(), ConfigError> {
    validate_timeout_secs("transcription.timeout_secs", transcription.timeout_secs)?;

    if transcription.provider == TranscriptionProvider::WhisperCpp {
        require_http_url("transcription.base_url", &transcription.base_url)?;
        if transcription.language.trim().is_empty() {
            return Err(ConfigError::Validation(
                "transcription.language is required for whisper_cpp (e.g. `hi`)".to_string(),
            ));
        }
    }

    if !(64 * 1024..=64 * 1024 * 1024).contains(&transcription.max_audio_bytes) {
        return Err(ConfigError::Validation(
            "transcription.max_audio_bytes must be in range 65536..=67108864".to_string(),
        ));
    }

    Ok(())
}

fn validate_pipeline(pipeline: &PipelineConfig) -> Result<(), ConfigError> {
    if pipeline.call_timeout_ms < 100 || pipeline.call_timeout_ms > 300_000 {
        return Err(ConfigError::Validation(
            "pipeline.call_timeout_ms must be in range 100..=300000".to_string(),
        ));
    }
    if pipeline.default_location.trim().is_empty() {
        return Err(ConfigError::Validation(
            "pipeline.default_location must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_delivery(delivery: &DeliveryConfig) -> Result<(), ConfigError> {
    let Some(gateway_url) = &delivery.gateway_url else {
        return Ok(());
    };
    require_http_url("delivery.gateway_url", gateway_url)?;

    let missing_token = delivery
        .gateway_token
        .as_ref()
        .map(|value| value.expose_secret().trim().is_empty())
        .unwrap_or(true);
    if missing_token {
        return Err(ConfigError::Validation(
            "delivery.gateway_token is required when delivery.gateway_url is set".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn validate_timeout_secs(key: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 || value > 300 {
        return Err(ConfigError::Validation(format!("{key} must be in range 1..=300")));
    }
    Ok(())
}

fn require_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    if !value.starts_with("http://") && !value.starts_with("https://") {
        return Err(ConfigError::Validation(format!("{key} must start with http:// or https://")));
    }
    Ok(())
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_env(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| invalid_env(key, value))
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| invalid_env(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| invalid_env(key, value))
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| invalid_env(key, value))
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.parse::<f64>().map_err(|_| invalid_env(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    weather: Option<WeatherPatch>,
    market: Option<MarketPatch>,
    llm: Option<LlmPatch>,
    transcription: Option<TranscriptionPatch>,
    pipeline: Option<PipelinePatch>,
    intent: Option<IntentPatch>,
    server: Option<ServerPatch>,
    delivery: Option<DeliveryPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct WeatherPatch {
    base_url: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    timezone: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct MarketPatch {
    primary_url: Option<String>,
    market_name: Option<String>,
    secondary: Option<SecondaryPriceSource>,
    secondary_url: Option<String>,
    secondary_api_key: Option<String>,
    reference_prices: Option<BTreeMap<String, Decimal>>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_prompt_chars: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct TranscriptionPatch {
    provider: Option<TranscriptionProvider>,
    base_url: Option<String>,
    language: Option<String>,
    timeout_secs: Option<u64>,
    max_audio_bytes: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct PipelinePatch {
    call_timeout_ms: Option<u64>,
    default_location: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct IntentPatch {
    keywords_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct DeliveryPatch {
    gateway_url: Option<String>,
    gateway_token: Option<String>,
    sender_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
