use thiserror::Error;

use crate::domain::query::Topic;
use crate::domain::reply::ReplyOrigin;
use crate::pipeline::states::{
    PipelineAction, PipelineContext, PipelineEvent, PipelineState, TransitionOutcome,
};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PipelineTransitionError {
    #[error("invalid transition from {state:?} on event {event:?}")]
    InvalidTransition { state: PipelineState, event: PipelineEvent },
    #[error("event {event:?} does not belong to the route for topic `{topic}`")]
    OffRoute { event: PipelineEvent, topic: Topic },
}

/// Transition table for one query's trip through the pipeline.
#[derive(Clone, Copy, Debug, Default)]
pub struct PipelineEngine;

impl PipelineEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn initial_state(&self) -> PipelineState {
        PipelineState::Received
    }

    pub fn apply(
        &self,
        current: &PipelineState,
        event: &PipelineEvent,
        context: &PipelineContext,
    ) -> Result<TransitionOutcome, PipelineTransitionError> {
        transition(current, event, context)
    }
}

/// First action taken after intent extraction for a topic.
pub fn route_for(topic: Topic) -> PipelineAction {
    match topic {
        Topic::Weather => PipelineAction::ConsultWeather,
        Topic::Price => PipelineAction::ConsultMarket,
        Topic::Irrigation | Topic::Pest | Topic::Fertilizer => PipelineAction::ConsultKnowledge,
        Topic::Other => PipelineAction::InvokeGenerative,
    }
}

fn transition(
    current: &PipelineState,
    event: &PipelineEvent,
    context: &PipelineContext,
) -> Result<TransitionOutcome, PipelineTransitionError> {
    use PipelineAction::{ComposeReply, ComposeStaticFallback, InvokeGenerative};
    use PipelineEvent::*;
    use PipelineState::*;

    let topic = context.topic;
    let (to, actions) = match (current, event) {
        (Received, IntentResolved) => (IntentExtracted, vec![route_for(topic)]),

        (IntentExtracted, WeatherFetched | WeatherFailed) if topic != Topic::Weather => {
            return Err(off_route(event, topic));
        }
        (IntentExtracted, PriceFetched | PriceFailed) if topic != Topic::Price => {
            return Err(off_route(event, topic));
        }
        (IntentExtracted, KnowledgeHit | KnowledgeMiss) if !topic.is_agronomic() => {
            return Err(off_route(event, topic));
        }
        (IntentExtracted, NoDeterministicSource) if topic != Topic::Other => {
            return Err(off_route(event, topic));
        }

        (IntentExtracted, WeatherFetched) => {
            (WeatherChecked, vec![ComposeReply(ReplyOrigin::Weather)])
        }
        (IntentExtracted, PriceFetched) => (PriceChecked, vec![ComposeReply(ReplyOrigin::Price)]),
        (IntentExtracted, KnowledgeHit) => {
            (KnowledgeChecked, vec![ComposeReply(ReplyOrigin::Knowledge)])
        }
        (
            IntentExtracted,
            WeatherFailed | PriceFailed | KnowledgeMiss | NoDeterministicSource,
        ) => (GenerativeAttempted, vec![InvokeGenerative]),

        (WeatherChecked | PriceChecked | KnowledgeChecked, ReplyComposed) => {
            (Answered, Vec::new())
        }
        (GenerativeAttempted, GenerationSucceeded) => {
            (Answered, vec![ComposeReply(ReplyOrigin::Generative)])
        }
        (GenerativeAttempted, GenerationFailed) => (StaticFallback, vec![ComposeStaticFallback]),
        (StaticFallback, ReplyComposed) => (Answered, Vec::new()),

        _ => {
            return Err(PipelineTransitionError::InvalidTransition {
                state: *current,
                event: *event,
            });
        }
    };

    Ok(TransitionOutcome { from: *current, to, event: *event, actions })
}

fn off_route(event: &PipelineEvent, topic: Topic) -> PipelineTransitionError {
    PipelineTransitionError::OffRoute { event: *event, topic }
}
