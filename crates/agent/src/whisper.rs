use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use sarthi_core::errors::{ProviderError, TranscriptionUnavailable};
use sarthi_core::providers::Transcriber;
use serde::Deserialize;
use tracing::debug;

/// Client for a local whisper.cpp server (`POST /inference`).
#[derive(Clone, Debug)]
pub struct WhisperCppTranscriber {
    http: reqwest::Client,
    base_url: String,
    language: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct InferenceResponse {
    #[serde(default)]
    text: String,
}

impl WhisperCppTranscriber {
    pub fn new(base_url: &str, language: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building whisper http client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            language: language.trim().to_string(),
            timeout,
        })
    }

    fn transport(&self, error: reqwest::Error) -> ProviderError {
        if error.is_timeout() {
            ProviderError::Timeout { after_ms: self.timeout.as_millis() as u64 }
        } else if error.is_decode() {
            ProviderError::Malformed(error.to_string())
        } else {
            ProviderError::Network(error.to_string())
        }
    }
}

#[async_trait]
impl Transcriber for WhisperCppTranscriber {
    fn name(&self) -> &'static str {
        "whisper_cpp"
    }

    async fn transcribe(&self, audio: &[u8]) -> Result<String, TranscriptionUnavailable> {
        let form = Form::new()
            .part("file", Part::bytes(audio.to_vec()).file_name("voice-note"))
            .text("language", self.language.clone())
            .text("response_format", "json")
            .text("temperature", "0.0");

        let response = self
            .http
            .post(format!("{}/inference", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|error| self.transport(error))?;
        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status().as_u16()).into());
        }

        let body: InferenceResponse =
            response.json().await.map_err(|error| self.transport(error))?;
        let text = body.text.trim();
        if text.is_empty() {
            return Err(ProviderError::Inference("no speech recognised".to_string()).into());
        }

        debug!(
            event_name = "agent.whisper.transcribed",
            audio_bytes = audio.len(),
            chars = text.chars().count(),
            "voice note transcribed"
        );
        Ok(text.to_string())
    }
}

/// Used when `transcription.provider = "disabled"`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledTranscriber;

#[async_trait]
impl Transcriber for DisabledTranscriber {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn transcribe(&self, _audio: &[u8]) -> Result<String, TranscriptionUnavailable> {
        Err(ProviderError::NotConfigured("transcription is disabled".to_string()).into())
    }
}
