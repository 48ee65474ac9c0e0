pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_settings, ping, DbPool};
pub use fixtures::{KnowledgeSeedDataset, SeedResult, VerificationResult};
pub use repositories::{KnowledgeRepository, RepositoryError, SqlKnowledgeRepository};
