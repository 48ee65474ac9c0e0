use serde::{Deserialize, Serialize};

use crate::domain::query::Topic;
use crate::domain::reply::ReplyOrigin;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    Received,
    IntentExtracted,
    KnowledgeChecked,
    WeatherChecked,
    PriceChecked,
    GenerativeAttempted,
    StaticFallback,
    Answered,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Answered)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineEvent {
    IntentResolved,
    KnowledgeHit,
    KnowledgeMiss,
    WeatherFetched,
    WeatherFailed,
    PriceFetched,
    PriceFailed,
    NoDeterministicSource,
    GenerationSucceeded,
    GenerationFailed,
    ReplyComposed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineAction {
    ConsultWeather,
    ConsultMarket,
    ConsultKnowledge,
    InvokeGenerative,
    ComposeReply(ReplyOrigin),
    ComposeStaticFallback,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineContext {
    pub topic: Topic,
}

impl Default for PipelineContext {
    fn default() -> Self {
        Self { topic: Topic::Other }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: PipelineState,
    pub to: PipelineState,
    pub event: PipelineEvent,
    pub actions: Vec<PipelineAction>,
}
