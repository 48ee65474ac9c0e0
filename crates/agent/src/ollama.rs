use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::llm::LlmClient;

const NUM_PREDICT: i32 = 256;
const TEMPERATURE: f32 = 0.3;

#[derive(Debug, Error)]
pub enum OllamaError {
    #[error("model `{0}` is not loaded on the inference endpoint")]
    ModelNotLoaded(String),
    #[error("inference endpoint returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("inference timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },
}

/// Client for a local Ollama server, non-streaming generation only.
#[derive(Clone, Debug)]
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: i32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TaggedModel>,
}

#[derive(Debug, Deserialize)]
struct TaggedModel {
    name: String,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building ollama http client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout,
        })
    }

    fn transport(&self, error: reqwest::Error, doing: &'static str) -> anyhow::Error {
        if error.is_timeout() {
            OllamaError::Timeout { after_ms: self.timeout.as_millis() as u64 }.into()
        } else {
            anyhow::Error::new(error).context(doing)
        }
    }

    /// Whether the configured model shows up in `/api/tags`.
    pub async fn model_available(&self) -> Result<bool> {
        let response = self
            .http
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(|error| self.transport(error, "listing ollama models"))?;
        if !response.status().is_success() {
            return Err(OllamaError::Status {
                status: response.status().as_u16(),
                message: "model listing failed".to_string(),
            }
            .into());
        }
        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|error| self.transport(error, "decoding ollama model list"))?;
        Ok(tags.models.iter().any(|model| {
            model.name == self.model || model.name.split(':').next() == Some(self.model.as_str())
        }))
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions { temperature: TEMPERATURE, num_predict: NUM_PREDICT },
        };

        let response = self
            .http
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|error| self.transport(error, "calling ollama generate"))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .await
                .map(|body| body.error)
                .unwrap_or_default();
            if status.as_u16() == 404 || message.contains("not found") {
                return Err(OllamaError::ModelNotLoaded(self.model.clone()).into());
            }
            return Err(OllamaError::Status { status: status.as_u16(), message }.into());
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|error| self.transport(error, "decoding ollama response"))?;
        debug!(
            event_name = "agent.ollama.completed",
            model = %self.model,
            chars = body.response.chars().count(),
            "ollama completion received"
        );
        Ok(body.response)
    }
}
