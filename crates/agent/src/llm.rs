use anyhow::Result;
use async_trait::async_trait;

/// Prompt in, completion out. Implementations must not retry on their own.
#[async_trait]
pub trait LlmClient: Send + Sync {
    fn model(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String>;
}
