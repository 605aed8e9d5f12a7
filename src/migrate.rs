//! Schema migrations.
//!
//! All statements are `IF NOT EXISTS`, so running them repeatedly is safe.
//!
//! | Table | Purpose |
//! |-------|---------|
//! | `conversations` | One row per ingested text |
//! | `segments` | Delimiter-split units with vector BLOB and labels |
//! | `annotations` | Append-only classification / pattern records |
//! | `embedding_cache` | Write-once vectors keyed by text fingerprint |

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create every table and index on an existing pool.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS conversations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS segments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            conversation_id INTEGER NOT NULL,
            position INTEGER NOT NULL,
            content TEXT NOT NULL,
            vector BLOB,
            content_type TEXT,
            insight_type TEXT,
            pattern_label TEXT,
            resonance_level TEXT,
            created_at INTEGER NOT NULL,
            UNIQUE(conversation_id, position),
            FOREIGN KEY (conversation_id) REFERENCES conversations(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS annotations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            segment_id INTEGER NOT NULL,
            kind TEXT NOT NULL,
            payload_json TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            FOREIGN KEY (segment_id) REFERENCES segments(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS embedding_cache (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            fingerprint TEXT NOT NULL UNIQUE,
            vector BLOB NOT NULL,
            model_tag TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_segments_conversation_id ON segments(conversation_id)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_annotations_segment_id ON annotations(segment_id)")
        .execute(pool)
        .await?;

    Ok(())
}
