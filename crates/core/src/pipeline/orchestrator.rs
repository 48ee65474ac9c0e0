use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::compose;
use crate::domain::price::PriceQuote;
use crate::domain::query::{Query, Topic};
use crate::domain::reply::Reply;
use crate::domain::weather::WeatherSnapshot;
use crate::errors::{GenerativeUnavailable, PriceUnavailable, ProviderError, WeatherUnavailable};
use crate::intent::IntentExtractor;
use crate::knowledge::{KnowledgeLookup, KnowledgeStore};
use crate::pipeline::engine::{PipelineEngine, PipelineTransitionError};
use crate::pipeline::states::{PipelineContext, PipelineEvent, PipelineState, TransitionOutcome};
use crate::providers::{GenerativeFallback, MarketPriceProvider, WeatherProvider};

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_LOCATION: &str = "Jaipur, Rajasthan";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Ceiling for any single provider call. The tiered price lookup may
    /// spend this once per tier.
    pub call_timeout: Duration,
    pub default_location: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self { call_timeout: DEFAULT_CALL_TIMEOUT, default_location: DEFAULT_LOCATION.to_owned() }
    }
}

/// Everything that happened while answering one query.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineRun {
    pub correlation_id: String,
    pub query: Query,
    pub reply: Reply,
    pub transitions: Vec<TransitionOutcome>,
}

impl PipelineRun {
    pub fn visited_states(&self) -> Vec<PipelineState> {
        let mut states = Vec::with_capacity(self.transitions.len() + 1);
        if let Some(first) = self.transitions.first() {
            states.push(first.from);
        }
        states.extend(self.transitions.iter().map(|outcome| outcome.to));
        states
    }
}

/// Routes a free-text question to the right advisory source and always
/// produces a reply.
pub struct Orchestrator {
    intent: Arc<dyn IntentExtractor>,
    knowledge: Arc<dyn KnowledgeStore>,
    weather: Arc<dyn WeatherProvider>,
    market: Arc<dyn MarketPriceProvider>,
    generative: Arc<dyn GenerativeFallback>,
    engine: PipelineEngine,
    settings: PipelineSettings,
}

impl Orchestrator {
    pub fn new(
        intent: Arc<dyn IntentExtractor>,
        knowledge: Arc<dyn KnowledgeStore>,
        weather: Arc<dyn WeatherProvider>,
        market: Arc<dyn MarketPriceProvider>,
        generative: Arc<dyn GenerativeFallback>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            intent,
            knowledge,
            weather,
            market,
            generative,
            engine: PipelineEngine::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn knowledge_entries(&self) -> usize {
        self.knowledge.len()
    }

    pub async fn orchestrate(&self, raw_text: &str, location: &str) -> Reply {
        self.run(raw_text, location).await.reply
    }

    pub async fn run(&self, raw_text: &str, location: &str) -> PipelineRun {
        let correlation_id = Uuid::new_v4().to_string();
        let location = match location.trim() {
            "" => self.settings.default_location.as_str(),
            trimmed => trimmed,
        };

        let query = self.intent.extract(raw_text, location);
        info!(
            event_name = "pipeline.intent.extracted",
            correlation_id = %correlation_id,
            crop = %query.crop,
            topic = %query.topic,
            growth_stage = query.growth_stage.as_deref().unwrap_or("*"),
            location = %query.location,
            "classified inbound question"
        );

        let mut trace = Trace::new(self.engine, PipelineContext { topic: query.topic });
        let reply = settle(self.drive(&query, &mut trace, &correlation_id).await, &correlation_id);

        info!(
            event_name = "pipeline.reply.assembled",
            correlation_id = %correlation_id,
            origin = reply.origin.as_str(),
            transitions = trace.transitions.len(),
            "reply assembled"
        );

        PipelineRun { correlation_id, query, reply, transitions: trace.transitions }
    }

    async fn drive(
        &self,
        query: &Query,
        trace: &mut Trace,
        correlation_id: &str,
    ) -> Result<Reply, PipelineTransitionError> {
        trace.advance(PipelineEvent::IntentResolved)?;

        match query.topic {
            Topic::Weather => match self.fetch_weather(&query.location).await {
                Ok(snapshot) => {
                    trace.advance(PipelineEvent::WeatherFetched)?;
                    trace.advance(PipelineEvent::ReplyComposed)?;
                    return Ok(compose::weather_reply(&snapshot));
                }
                Err(unavailable) => {
                    log_unavailable(correlation_id, "weather", unavailable.0.class(), &unavailable);
                    trace.advance(PipelineEvent::WeatherFailed)?;
                }
            },
            Topic::Price => match self.fetch_price(query).await {
                Ok(quote) => {
                    trace.advance(PipelineEvent::PriceFetched)?;
                    trace.advance(PipelineEvent::ReplyComposed)?;
                    return Ok(compose::price_reply(&quote));
                }
                Err(unavailable) => {
                    let class = match &unavailable {
                        PriceUnavailable::UnsupportedCrop(_) => "unsupported_crop",
                        PriceUnavailable::Exhausted { .. } => "exhausted",
                    };
                    log_unavailable(correlation_id, "market", class, &unavailable);
                    trace.advance(PipelineEvent::PriceFailed)?;
                }
            },
            Topic::Irrigation | Topic::Pest | Topic::Fertilizer => {
                let lookup = match query.growth_stage.as_deref() {
                    Some(stage) => self.knowledge.lookup_stage(query.crop, query.topic, stage),
                    None => self.knowledge.lookup(query.crop, query.topic),
                };
                match lookup {
                    KnowledgeLookup::Found(entry) => {
                        let reply = compose::knowledge_reply(query, entry);
                        trace.advance(PipelineEvent::KnowledgeHit)?;
                        trace.advance(PipelineEvent::ReplyComposed)?;
                        return Ok(reply);
                    }
                    KnowledgeLookup::NotFound => {
                        debug!(
                            event_name = "pipeline.knowledge.miss",
                            correlation_id = %correlation_id,
                            crop = %query.crop,
                            topic = %query.topic,
                            growth_stage = query.growth_stage.as_deref().unwrap_or("*"),
                            "no curated advice, escalating"
                        );
                        trace.advance(PipelineEvent::KnowledgeMiss)?;
                    }
                }
            }
            Topic::Other => trace.advance(PipelineEvent::NoDeterministicSource)?,
        }

        match self.generate(query).await {
            Ok(text) => {
                trace.advance(PipelineEvent::GenerationSucceeded)?;
                Ok(compose::generative_reply(&text))
            }
            Err(unavailable) => {
                log_unavailable(correlation_id, "generative", unavailable.0.class(), &unavailable);
                trace.advance(PipelineEvent::GenerationFailed)?;
                trace.advance(PipelineEvent::ReplyComposed)?;
                Ok(compose::static_fallback_reply())
            }
        }
    }

    async fn fetch_weather(&self, location: &str) -> Result<WeatherSnapshot, WeatherUnavailable> {
        bounded(self.settings.call_timeout, self.weather.fetch(location))
            .await
            .map_err(WeatherUnavailable)?
    }

    async fn fetch_price(&self, query: &Query) -> Result<PriceQuote, PriceUnavailable> {
        // Primary and secondary tiers each get a full call budget.
        let ceiling = self.settings.call_timeout.saturating_mul(2);
        match bounded(ceiling, self.market.fetch(query.crop)).await {
            Ok(result) => result,
            Err(timeout) => {
                Err(PriceUnavailable::Exhausted { primary: timeout.clone(), secondary: timeout })
            }
        }
    }

    async fn generate(&self, query: &Query) -> Result<String, GenerativeUnavailable> {
        let text = bounded(self.settings.call_timeout, self.generative.generate(query))
            .await
            .map_err(GenerativeUnavailable)??;
        if text.trim().is_empty() {
            return Err(GenerativeUnavailable(ProviderError::Inference(
                "model returned an empty completion".to_owned(),
            )));
        }
        Ok(text)
    }
}

struct Trace {
    engine: PipelineEngine,
    context: PipelineContext,
    state: PipelineState,
    transitions: Vec<TransitionOutcome>,
}

impl Trace {
    fn new(engine: PipelineEngine, context: PipelineContext) -> Self {
        Self { state: engine.initial_state(), engine, context, transitions: Vec::new() }
    }

    fn advance(&mut self, event: PipelineEvent) -> Result<(), PipelineTransitionError> {
        let outcome = self.engine.apply(&self.state, &event, &self.context)?;
        self.state = outcome.to;
        self.transitions.push(outcome);
        Ok(())
    }
}

async fn bounded<T>(limit: Duration, call: impl Future<Output = T>) -> Result<T, ProviderError> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| ProviderError::Timeout { after_ms: limit.as_millis() as u64 })
}

fn settle(result: Result<Reply, PipelineTransitionError>, correlation_id: &str) -> Reply {
    match result {
        Ok(reply) => reply,
        Err(transition_error) => {
            error!(
                event_name = "pipeline.transition.rejected",
                correlation_id = %correlation_id,
                error = %transition_error,
                "pipeline reached an illegal transition, answering with static fallback"
            );
            compose::static_fallback_reply()
        }
    }
}

fn log_unavailable(
    correlation_id: &str,
    provider: &'static str,
    error_class: &'static str,
    error: &dyn std::fmt::Display,
) {
    warn!(
        event_name = "pipeline.provider.unavailable",
        correlation_id = %correlation_id,
        provider,
        error_class,
        error = %error,
        "provider unavailable"
    );
}
