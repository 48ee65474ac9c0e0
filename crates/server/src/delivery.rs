use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sarthi_core::config::DeliveryConfig;
use sarthi_core::domain::reply::Reply;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("delivery client could not be built: {0}")]
    Client(#[source] reqwest::Error),
    #[error("delivery request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("gateway rejected delivery with status {0}")]
    Rejected(u16),
}

/// Sends an assembled reply back to the farmer's messaging channel.
#[async_trait]
pub trait ReplyDelivery: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(&self, to_number: &str, reply: &Reply) -> Result<(), DeliveryError>;
}

/// Posts `{from, to, message}` to a messaging gateway.
pub struct GatewayDelivery {
    client: reqwest::Client,
    url: String,
    token: Option<SecretString>,
    sender_id: String,
}

#[derive(Serialize)]
struct OutboundMessage<'a> {
    from: &'a str,
    to: &'a str,
    message: &'a str,
}

impl GatewayDelivery {
    pub fn new(
        url: String,
        token: Option<SecretString>,
        sender_id: String,
    ) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(DELIVERY_TIMEOUT)
            .build()
            .map_err(DeliveryError::Client)?;
        Ok(Self { client, url, token, sender_id })
    }
}

#[async_trait]
impl ReplyDelivery for GatewayDelivery {
    fn name(&self) -> &'static str {
        "gateway"
    }

    async fn deliver(&self, to_number: &str, reply: &Reply) -> Result<(), DeliveryError> {
        let mut request = self.client.post(&self.url).json(&OutboundMessage {
            from: &self.sender_id,
            to: to_number,
            message: &reply.text,
        });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await.map_err(DeliveryError::Transport)?;
        if !response.status().is_success() {
            return Err(DeliveryError::Rejected(response.status().as_u16()));
        }
        debug!(event_name = "delivery.gateway.sent", origin = %reply.origin, "reply delivered");
        Ok(())
    }
}

/// Used when no gateway is configured; the webhook response is the only channel.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopDelivery;

#[async_trait]
impl ReplyDelivery for NoopDelivery {
    fn name(&self) -> &'static str {
        "noop"
    }

    async fn deliver(&self, _to_number: &str, _reply: &Reply) -> Result<(), DeliveryError> {
        Ok(())
    }
}

pub fn build_delivery(config: &DeliveryConfig) -> Result<Arc<dyn ReplyDelivery>, DeliveryError> {
    match (&config.gateway_url, &config.sender_id) {
        (Some(url), Some(sender_id)) => Ok(Arc::new(GatewayDelivery::new(
            url.clone(),
            config.gateway_token.clone(),
            sender_id.clone(),
        )?)),
        _ => Ok(Arc::new(NoopDelivery)),
    }
}
