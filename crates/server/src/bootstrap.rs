use std::sync::Arc;

use sarthi_core::config::{AppConfig, ConfigError, LoadOptions};
use sarthi_core::intent::{KeywordIntentExtractor, KeywordTable, KeywordTableError};
use sarthi_core::pipeline::Orchestrator;
use sarthi_core::providers::Transcriber;
use sarthi_db::{connect_with_settings, migrations, DbPool, RepositoryError, SqlKnowledgeRepository};
use sarthi_feeds::{build_price_provider, build_weather_provider, FeedError};
use thiserror::Error;
use tracing::{info, warn};

use crate::delivery::{build_delivery, DeliveryError, ReplyDelivery};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub orchestrator: Arc<Orchestrator>,
    pub delivery: Arc<dyn ReplyDelivery>,
    pub transcriber: Arc<dyn Transcriber>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("knowledge snapshot could not be loaded: {0}")]
    Knowledge(#[source] RepositoryError),
    #[error(transparent)]
    Keywords(#[from] KeywordTableError),
    #[error(transparent)]
    Feeds(#[from] FeedError),
    #[error("generative provider could not be initialized: {0:#}")]
    Generative(anyhow::Error),
    #[error("transcription provider could not be initialized: {0:#}")]
    Transcription(anyhow::Error),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

/// Connects, migrates, snapshots the knowledge table and wires the pipeline.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let knowledge = SqlKnowledgeRepository::new(db_pool.clone())
        .load_store()
        .await
        .map_err(BootstrapError::Knowledge)?;
    if knowledge.entries().next().is_none() {
        warn!(
            event_name = "system.bootstrap.knowledge_empty",
            correlation_id = "bootstrap",
            "knowledge table is empty, agronomic questions will use the generative fallback"
        );
    }

    let keywords = KeywordTable::load_or_default(config.intent.keywords_path.as_deref())?;
    let weather = build_weather_provider(&config)?;
    let market = build_price_provider(&config)?;
    let generative =
        sarthi_agent::build_generative_fallback(&config.llm).map_err(BootstrapError::Generative)?;
    let transcriber = sarthi_agent::build_transcriber(&config.transcription)
        .map_err(BootstrapError::Transcription)?;
    let delivery = build_delivery(&config.delivery)?;

    let orchestrator = Orchestrator::new(
        Arc::new(KeywordIntentExtractor::new(keywords)),
        Arc::new(knowledge),
        Arc::new(weather),
        Arc::new(market),
        generative,
        config.pipeline.settings(),
    );
    info!(
        event_name = "system.bootstrap.pipeline_ready",
        correlation_id = "bootstrap",
        knowledge_entries = orchestrator.knowledge_entries(),
        llm_provider = ?config.llm.provider,
        delivery = delivery.name(),
        transcriber = transcriber.name(),
        "advisory pipeline wired"
    );

    Ok(Application { config, db_pool, orchestrator: Arc::new(orchestrator), delivery, transcriber })
}
