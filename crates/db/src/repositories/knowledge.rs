use async_trait::async_trait;
use sarthi_core::domain::knowledge::{normalize_stage, KnowledgeEntry};
use sarthi_core::domain::query::{Crop, Topic};
use sarthi_core::knowledge::InMemoryKnowledgeStore;
use sqlx::{sqlite::SqliteRow, Row};
use tracing::info;

use super::{KnowledgeRepository, RepositoryError};
use crate::DbPool;

/// Stored growth stage for rows that apply to every stage.
const WILDCARD_STAGE: &str = "";

pub struct SqlKnowledgeRepository {
    pool: DbPool,
}

impl SqlKnowledgeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Reads the whole table into the immutable snapshot the pipeline serves from.
    pub async fn load_store(&self) -> Result<InMemoryKnowledgeStore, RepositoryError> {
        let entries = self.load_all().await?;
        let store = InMemoryKnowledgeStore::from_entries(entries)?;
        info!(
            event_name = "knowledge.snapshot.loaded",
            entries = store.entries().count(),
            "knowledge snapshot loaded"
        );
        Ok(store)
    }
}

#[async_trait]
impl KnowledgeRepository for SqlKnowledgeRepository {
    async fn load_all(&self) -> Result<Vec<KnowledgeEntry>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT crop, topic, growth_stage, advice_text
            FROM knowledge_entry
            ORDER BY crop, topic, growth_stage
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(knowledge_entry_from_row).collect()
    }

    async fn upsert(&self, entry: &KnowledgeEntry, source: &str) -> Result<(), RepositoryError> {
        let stage = entry
            .growth_stage
            .as_deref()
            .map(normalize_stage)
            .unwrap_or_else(|| WILDCARD_STAGE.to_string());

        sqlx::query(
            r#"
            INSERT INTO knowledge_entry (crop, topic, growth_stage, advice_text, source, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
            ON CONFLICT (crop, topic, growth_stage) DO UPDATE SET
                advice_text = excluded.advice_text,
                source = excluded.source,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(entry.crop.as_str())
        .bind(entry.topic.as_str())
        .bind(stage)
        .bind(entry.advice_text.trim())
        .bind(source)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM knowledge_entry").fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }
}

fn knowledge_entry_from_row(row: &SqliteRow) -> Result<KnowledgeEntry, RepositoryError> {
    let crop_label: String = row.try_get("crop")?;
    let topic_label: String = row.try_get("topic")?;
    let growth_stage: String = row.try_get("growth_stage")?;

    let crop = Crop::parse(&crop_label)
        .filter(Crop::is_known)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown crop `{crop_label}`")))?;
    let topic = Topic::parse(&topic_label)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown topic `{topic_label}`")))?;

    Ok(KnowledgeEntry {
        crop,
        topic,
        growth_stage: (!growth_stage.trim().is_empty()).then_some(growth_stage),
        advice_text: row.try_get("advice_text")?,
    })
}
