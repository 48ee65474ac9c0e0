use async_trait::async_trait;
use thiserror::Error;

use sarthi_core::domain::knowledge::KnowledgeEntry;
use sarthi_core::errors::KnowledgeLoadError;

pub mod knowledge;

pub use knowledge::SqlKnowledgeRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("knowledge table is inconsistent: {0}")]
    Knowledge(#[from] KnowledgeLoadError),
}

#[async_trait]
pub trait KnowledgeRepository: Send + Sync {
    async fn load_all(&self) -> Result<Vec<KnowledgeEntry>, RepositoryError>;
    async fn upsert(&self, entry: &KnowledgeEntry, source: &str) -> Result<(), RepositoryError>;
    async fn count(&self) -> Result<u64, RepositoryError>;
}
