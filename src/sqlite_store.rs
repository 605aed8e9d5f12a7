//! SQLite-backed [`Store`] implementation.
//!
//! Maps each [`Store`] operation onto the schema created by
//! [`migrate::apply_schema`](crate::migrate::apply_schema). Vectors are
//! stored as little-endian f32 BLOBs and labels as their wire names.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

use choff_core::embedding::{blob_to_vec, vec_to_blob};
use choff_core::models::{
    Annotation, AnnotationKind, CacheEntry, ContentType, Conversation, InsightType, PatternType,
    ResonanceLevel, Segment,
};
use choff_core::store::Store;
use choff_core::Error;

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Number of rows in the embedding cache.
    pub async fn cache_len(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM embedding_cache")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn parse_label<L>(value: Option<String>) -> Result<Option<L>>
where
    L: FromStr<Err = Error>,
{
    Ok(value.map(|s| s.parse::<L>()).transpose()?)
}

fn row_to_segment(row: &SqliteRow) -> Result<Segment> {
    let vector: Option<Vec<u8>> = row.get("vector");
    Ok(Segment {
        id: row.get("id"),
        conversation_id: row.get("conversation_id"),
        position: row.get("position"),
        content: row.get("content"),
        vector: vector.map(|blob| blob_to_vec(&blob)),
        content_type: parse_label(row.get("content_type"))?,
        insight_type: parse_label(row.get("insight_type"))?,
        pattern_label: parse_label(row.get("pattern_label"))?,
        resonance_level: parse_label(row.get("resonance_level"))?,
    })
}

fn ensure_updated(rows_affected: u64, id: i64) -> Result<()> {
    if rows_affected == 0 {
        return Err(Error::not_found(format!("segment {}", id)).into());
    }
    Ok(())
}

const SEGMENT_COLUMNS: &str = "id, conversation_id, position, content, vector, content_type, \
     insight_type, pattern_label, resonance_level";

#[async_trait]
impl Store for SqliteStore {
    async fn create_conversation(&self, title: &str) -> Result<i64> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query("INSERT INTO conversations (title, created_at) VALUES (?, ?)")
            .bind(title)
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    async fn get_conversation(&self, id: i64) -> Result<Option<Conversation>> {
        let row = sqlx::query("SELECT id, title, created_at FROM conversations WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        let segments = self.query_segments_by_conversation(id).await?;

        Ok(Some(Conversation {
            id: row.get("id"),
            title: row.get("title"),
            created_at: row.get("created_at"),
            segments,
        }))
    }

    async fn create_segment(&self, conversation_id: i64, content: &str) -> Result<i64> {
        let exists: bool = sqlx::query_scalar("SELECT COUNT(*) > 0 FROM conversations WHERE id = ?")
            .bind(conversation_id)
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Err(Error::not_found(format!("conversation {}", conversation_id)).into());
        }

        // Position is computed under the INSERT's own write lock.
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            INSERT INTO segments (conversation_id, position, content, created_at)
            SELECT ?, COALESCE(MAX(position) + 1, 0), ?, ?
            FROM segments WHERE conversation_id = ?
            "#,
        )
        .bind(conversation_id)
        .bind(content)
        .bind(now)
        .bind(conversation_id)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn update_segment_vector(&self, id: i64, vector: &[f32]) -> Result<()> {
        let result = sqlx::query("UPDATE segments SET vector = ? WHERE id = ?")
            .bind(vec_to_blob(vector))
            .bind(id)
            .execute(&self.pool)
            .await?;
        ensure_updated(result.rows_affected(), id)
    }

    async fn update_segment_classification(
        &self,
        id: i64,
        content_type: ContentType,
        insight_type: InsightType,
    ) -> Result<()> {
        let result =
            sqlx::query("UPDATE segments SET content_type = ?, insight_type = ? WHERE id = ?")
                .bind(content_type.as_str())
                .bind(insight_type.as_str())
                .bind(id)
                .execute(&self.pool)
                .await?;
        ensure_updated(result.rows_affected(), id)
    }

    async fn update_segment_pattern(
        &self,
        id: i64,
        pattern_label: PatternType,
        resonance_level: ResonanceLevel,
    ) -> Result<()> {
        let result =
            sqlx::query("UPDATE segments SET pattern_label = ?, resonance_level = ? WHERE id = ?")
                .bind(pattern_label.as_str())
                .bind(resonance_level.as_str())
                .bind(id)
                .execute(&self.pool)
                .await?;
        ensure_updated(result.rows_affected(), id)
    }

    async fn create_annotation(
        &self,
        segment_id: i64,
        kind: AnnotationKind,
        payload: &serde_json::Value,
    ) -> Result<i64> {
        let exists: bool = sqlx::query_scalar("SELECT COUNT(*) > 0 FROM segments WHERE id = ?")
            .bind(segment_id)
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Err(Error::not_found(format!("segment {}", segment_id)).into());
        }

        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            "INSERT INTO annotations (segment_id, kind, payload_json, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(segment_id)
        .bind(kind.as_str())
        .bind(payload.to_string())
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn query_segments_by_conversation(&self, conversation_id: i64) -> Result<Vec<Segment>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM segments WHERE conversation_id = ? ORDER BY position ASC",
            SEGMENT_COLUMNS
        ))
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_segment).collect()
    }

    async fn query_annotations_by_segment(&self, segment_id: i64) -> Result<Vec<Annotation>> {
        let rows = sqlx::query(
            "SELECT id, segment_id, kind, payload_json, created_at FROM annotations WHERE segment_id = ? ORDER BY id ASC",
        )
        .bind(segment_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<Annotation> {
                let kind: String = row.get("kind");
                let payload_json: String = row.get("payload_json");
                Ok(Annotation {
                    id: row.get("id"),
                    segment_id: row.get("segment_id"),
                    kind: kind.parse::<AnnotationKind>()?,
                    payload: serde_json::from_str(&payload_json)?,
                    created_at: row.get("created_at"),
                })
            })
            .collect()
    }

    async fn get_cached_vector(&self, fingerprint: &str) -> Result<Option<Vec<f32>>> {
        let blob: Option<Vec<u8>> =
            sqlx::query_scalar("SELECT vector FROM embedding_cache WHERE fingerprint = ?")
                .bind(fingerprint)
                .fetch_optional(&self.pool)
                .await?;
        Ok(blob.map(|b| blob_to_vec(&b)))
    }

    async fn put_cached_vector(&self, entry: &CacheEntry) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO embedding_cache (fingerprint, vector, model_tag, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(fingerprint) DO NOTHING
            "#,
        )
        .bind(&entry.fingerprint)
        .bind(vec_to_blob(&entry.vector))
        .bind(&entry.model_tag)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
