//! Per-query advisory pipeline: intent, deterministic sources, then
//! generative and static fallbacks.

pub mod engine;
pub mod orchestrator;
pub mod states;

pub use engine::{route_for, PipelineEngine, PipelineTransitionError};
pub use orchestrator::{
    Orchestrator, PipelineRun, PipelineSettings, DEFAULT_CALL_TIMEOUT, DEFAULT_LOCATION,
};
pub use states::{PipelineAction, PipelineContext, PipelineEvent, PipelineState, TransitionOutcome};
