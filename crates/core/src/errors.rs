use thiserror::Error;

use crate::domain::knowledge::KnowledgeKey;

/// Reason an external call produced no usable value.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("network failure: {0}")]
    Network(String),
    #[error("timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },
    #[error("upstream returned status {0}")]
    Status(u16),
    #[error("malformed upstream data: {0}")]
    Malformed(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
    #[error("inference failed: {0}")]
    Inference(String),
}

impl ProviderError {
    pub fn class(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Timeout { .. } => "timeout",
            Self::Status(_) => "status",
            Self::Malformed(_) => "malformed",
            Self::NotConfigured(_) => "not_configured",
            Self::Inference(_) => "inference",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("weather unavailable: {0}")]
pub struct WeatherUnavailable(#[from] pub ProviderError);

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PriceUnavailable {
    #[error("no price source covers crop `{0}`")]
    UnsupportedCrop(String),
    #[error("price sources exhausted (primary: {primary}; secondary: {secondary})")]
    Exhausted { primary: ProviderError, secondary: ProviderError },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("generative fallback unavailable: {0}")]
pub struct GenerativeUnavailable(#[from] pub ProviderError);

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("transcription unavailable: {0}")]
pub struct TranscriptionUnavailable(#[from] pub ProviderError);

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum KnowledgeLoadError {
    #[error("duplicate knowledge entry for {0}")]
    DuplicateKey(KnowledgeKey),
    #[error("knowledge entry for {0} has empty advice text")]
    EmptyAdvice(KnowledgeKey),
    #[error("knowledge entries must name a known crop and a concrete topic, got {0}")]
    UnroutableKey(KnowledgeKey),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error("invalid inbound message: {0}")]
    InvalidMessage(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The message could not be processed. Check sender and text and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The advisory service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::InvalidMessage(message) => {
                Self::BadRequest { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Persistence(message) | ApplicationError::Integration(message) => {
                Self::ServiceUnavailable { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}
