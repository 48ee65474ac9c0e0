use std::sync::Arc;

use crate::commands::{current_thread_runtime, load_config, CommandFailure, CommandResult};
use sarthi_core::config::AppConfig;
use sarthi_core::intent::{KeywordIntentExtractor, KeywordTable};
use sarthi_core::pipeline::{Orchestrator, PipelineRun};
use sarthi_db::{connect_with_settings, migrations, SqlKnowledgeRepository};
use sarthi_feeds::{build_price_provider, build_weather_provider};
use serde_json::json;

pub fn run(message: &str, location: &str) -> CommandResult {
    match execute(message, location) {
        Ok(run) => {
            let data = json!({
                "correlation_id": run.correlation_id,
                "origin": run.reply.origin,
                "crop": run.query.crop,
                "topic": run.query.topic,
                "location": run.query.location,
                "states": run.visited_states(),
            });
            CommandResult::success_with("ask", run.reply.text, Some(data))
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("ask", error_class, message, exit_code)
        }
    }
}

fn execute(message: &str, location: &str) -> Result<PipelineRun, CommandFailure> {
    let config = load_config()?;
    let runtime = current_thread_runtime()?;

    runtime.block_on(async {
        let orchestrator = build_orchestrator(&config).await?;
        Ok(orchestrator.run(message, location).await)
    })
}

/// Same wiring as the server, against the configured database and providers.
async fn build_orchestrator(config: &AppConfig) -> Result<Orchestrator, CommandFailure> {
    let pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
    migrations::run_pending(&pool).await.map_err(|error| ("migration", error.to_string(), 5u8))?;

    let knowledge = SqlKnowledgeRepository::new(pool.clone())
        .load_store()
        .await
        .map_err(|error| ("knowledge_load", error.to_string(), 6u8))?;
    pool.close().await;

    let wiring = |error: String| ("pipeline_wiring", error, 7u8);
    let keywords = KeywordTable::load_or_default(config.intent.keywords_path.as_deref())
        .map_err(|error| wiring(error.to_string()))?;
    let weather = build_weather_provider(config).map_err(|error| wiring(error.to_string()))?;
    let market = build_price_provider(config).map_err(|error| wiring(error.to_string()))?;
    let generative = sarthi_agent::build_generative_fallback(&config.llm)
        .map_err(|error| wiring(format!("{error:#}")))?;

    Ok(Orchestrator::new(
        Arc::new(KeywordIntentExtractor::new(keywords)),
        Arc::new(knowledge),
        Arc::new(weather),
        Arc::new(market),
        generative,
        config.pipeline.settings(),
    ))
}
