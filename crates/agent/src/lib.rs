//! Local model integrations: the generative fallback for questions no
//! deterministic source could answer, and speech-to-text for voice notes.
//!
//! The model only phrases an answer to the farmer's question. Prices, weather
//! readings and curated advice never come from here.

pub mod fallback;
pub mod llm;
pub mod ollama;
pub mod whisper;

use std::sync::Arc;
use std::time::Duration;

use sarthi_core::config::{LlmConfig, LlmProvider, TranscriptionConfig, TranscriptionProvider};
use sarthi_core::providers::{GenerativeFallback, Transcriber};

pub use fallback::{build_prompt, DisabledGenerativeFallback, LlmGenerativeFallback};
pub use llm::LlmClient;
pub use ollama::{OllamaClient, OllamaError};
pub use whisper::{DisabledTranscriber, WhisperCppTranscriber};

/// Wires the configured provider behind the [`GenerativeFallback`] port.
pub fn build_generative_fallback(config: &LlmConfig) -> anyhow::Result<Arc<dyn GenerativeFallback>> {
    match config.provider {
        LlmProvider::Ollama => {
            let client = OllamaClient::new(
                &config.base_url,
                &config.model,
                Duration::from_secs(config.timeout_secs),
            )?;
            Ok(Arc::new(LlmGenerativeFallback::new(Arc::new(client), config.max_prompt_chars)))
        }
        LlmProvider::Disabled => Ok(Arc::new(DisabledGenerativeFallback)),
    }
}

pub fn build_transcriber(config: &TranscriptionConfig) -> anyhow::Result<Arc<dyn Transcriber>> {
    match config.provider {
        TranscriptionProvider::WhisperCpp => Ok(Arc::new(WhisperCppTranscriber::new(
            &config.base_url,
            &config.language,
            Duration::from_secs(config.timeout_secs),
        )?)),
        TranscriptionProvider::Disabled => Ok(Arc::new(DisabledTranscriber)),
    }
}

#[cfg(test)]
mod tests {
    use sarthi_core::config::{AppConfig, LlmProvider};
    use sarthi_core::domain::query::{Crop, Query, Topic};
    use sarthi_core::errors::ProviderError;

    use super::{build_generative_fallback, build_transcriber};

    #[tokio::test]
    async fn disabled_provider_reports_not_configured() {
        let mut config = AppConfig::default();
        config.llm.provider = LlmProvider::Disabled;

        let fallback = build_generative_fallback(&config.llm).expect("fallback");
        let error = fallback
            .generate(&Query::new("hello", Crop::Unknown, Topic::Other, "Jaipur"))
            .await
            .expect_err("disabled");

        assert!(matches!(error.0, ProviderError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn default_transcriber_is_disabled() {
        let transcriber = build_transcriber(&AppConfig::default().transcription).expect("transcriber");
        assert_eq!(transcriber.name(), "disabled");

        let error = transcriber.transcribe(b"OggS").await.expect_err("disabled");
        assert!(matches!(error.0, ProviderError::NotConfigured(_)));
    }

    #[test]
    fn ollama_provider_builds_from_defaults() {
        assert!(build_generative_fallback(&AppConfig::default().llm).is_ok());
    }
}
