use std::sync::Arc;

use async_trait::async_trait;
use sarthi_core::domain::query::Query;
use sarthi_core::errors::{GenerativeUnavailable, ProviderError};
use sarthi_core::providers::GenerativeFallback;
use tracing::warn;

use crate::llm::LlmClient;
use crate::ollama::OllamaError;

const INSTRUCTION: &str = "आप जयपुर, राजस्थान के किसानों के लिए एक कृषि सलाहकार हैं। \
नीचे दिए गए प्रश्न का उत्तर सरल हिंदी में 3-4 वाक्यों में दें। \
कोई मंडी भाव या मौसम का आंकड़ा अपनी ओर से न बताएं।";

/// Cap for the free-form location taken from the inbound message.
pub const MAX_LOCATION_CHARS: usize = 80;

/// Hindi prompt built from the query. `raw_text` is cut to `max_question_chars`
/// characters and the location to [`MAX_LOCATION_CHARS`], never mid-character.
pub fn build_prompt(query: &Query, max_question_chars: usize) -> String {
    let question = truncate_chars(&query.raw_text, max_question_chars);
    let location = truncate_chars(&query.location, MAX_LOCATION_CHARS);
    let stage = match query.growth_stage.as_deref() {
        Some(stage) => format!("अवस्था: {}\n", truncate_chars(stage, MAX_LOCATION_CHARS)),
        None => String::new(),
    };
    format!(
        "{INSTRUCTION}\n\nफसल: {}\nविषय: {}\n{stage}स्थान: {location}\nप्रश्न: {question}\nउत्तर:",
        query.crop.hindi_name(),
        query.topic.hindi_label(),
    )
}

fn truncate_chars(value: &str, max_chars: usize) -> String {
    value.trim().chars().take(max_chars).collect()
}

pub struct LlmGenerativeFallback {
    client: Arc<dyn LlmClient>,
    max_question_chars: usize,
}

impl LlmGenerativeFallback {
    pub fn new(client: Arc<dyn LlmClient>, max_question_chars: usize) -> Self {
        Self { client, max_question_chars }
    }
}

#[async_trait]
impl GenerativeFallback for LlmGenerativeFallback {
    async fn generate(&self, query: &Query) -> Result<String, GenerativeUnavailable> {
        let prompt = build_prompt(query, self.max_question_chars);
        let completion = self.client.complete(&prompt).await.map_err(|error| {
            let mapped = classify(&error);
            warn!(
                event_name = "agent.generation.failed",
                model = self.client.model(),
                error_class = mapped.class(),
                error = %error,
                "generative completion failed"
            );
            GenerativeUnavailable(mapped)
        })?;

        let text = completion.trim();
        if text.is_empty() {
            return Err(GenerativeUnavailable(ProviderError::Inference(
                "model returned an empty completion".to_string(),
            )));
        }
        Ok(text.to_string())
    }
}

/// Used when `llm.provider = "disabled"`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledGenerativeFallback;

#[async_trait]
impl GenerativeFallback for DisabledGenerativeFallback {
    async fn generate(&self, _query: &Query) -> Result<String, GenerativeUnavailable> {
        Err(GenerativeUnavailable(ProviderError::NotConfigured(
            "generative provider is disabled".to_string(),
        )))
    }
}

fn classify(error: &anyhow::Error) -> ProviderError {
    if let Some(ollama) = error.downcast_ref::<OllamaError>() {
        return match ollama {
            OllamaError::ModelNotLoaded(_) => ProviderError::NotConfigured(ollama.to_string()),
            OllamaError::Status { status, .. } => ProviderError::Status(*status),
            OllamaError::Timeout { after_ms } => ProviderError::Timeout { after_ms: *after_ms },
        };
    }
    let connect_failure = error
        .chain()
        .filter_map(|cause| cause.downcast_ref::<reqwest::Error>())
        .any(|transport| transport.is_connect());
    if connect_failure {
        return ProviderError::Network(format!("{error:#}"));
    }
    ProviderError::Inference(format!("{error:#}"))
}
