//! Read-side queries over processed conversations.
//!
//! Used by the `choff segments` / `choff annotations` commands and the
//! `GET /conversations/{id}/...` HTTP endpoints.

use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;

use choff_core::models::{AnnotationKind, ContentType, InsightType, PatternType, ResonanceLevel};
use choff_core::store::Store;
use choff_core::Error;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// Segment as exposed to clients.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentResponse {
    pub id: i64,
    pub content: String,
    pub content_type: Option<ContentType>,
    pub insight_type: Option<InsightType>,
    pub pattern_label: Option<PatternType>,
    pub resonance_level: Option<ResonanceLevel>,
}

/// Annotation as exposed to clients.
#[derive(Debug, Clone, Serialize)]
pub struct AnnotationResponse {
    pub kind: AnnotationKind,
    pub payload: serde_json::Value,
    pub created_at: String, // ISO8601
}

/// Segments of a conversation in order.
///
/// Fails with [`Error::NotFound`] when the conversation does not exist or
/// has no segments (a run that failed before its first segment was written).
pub async fn get_segments(store: &dyn Store, conversation_id: i64) -> Result<Vec<SegmentResponse>> {
    let conversation = store
        .get_conversation(conversation_id)
        .await?
        .filter(|c| !c.segments.is_empty())
        .ok_or_else(|| Error::not_found(format!("conversation {}", conversation_id)))?;

    Ok(conversation
        .segments
        .into_iter()
        .map(|s| SegmentResponse {
            id: s.id,
            content: s.content,
            content_type: s.content_type,
            insight_type: s.insight_type,
            pattern_label: s.pattern_label,
            resonance_level: s.resonance_level,
        })
        .collect())
}

/// Annotations of a conversation, grouped by segment id.
///
/// Fails with [`Error::NotFound`] under the same conditions as [`get_segments`].
pub async fn get_annotations(
    store: &dyn Store,
    conversation_id: i64,
) -> Result<BTreeMap<i64, Vec<AnnotationResponse>>> {
    let conversation = store
        .get_conversation(conversation_id)
        .await?
        .filter(|c| !c.segments.is_empty())
        .ok_or_else(|| Error::not_found(format!("conversation {}", conversation_id)))?;

    let mut grouped = BTreeMap::new();
    for segment in &conversation.segments {
        let annotations = store.query_annotations_by_segment(segment.id).await?;
        grouped.insert(
            segment.id,
            annotations
                .into_iter()
                .map(|a| AnnotationResponse {
                    kind: a.kind,
                    payload: a.payload,
                    created_at: format_ts_iso(a.created_at),
                })
                .collect(),
        );
    }
    Ok(grouped)
}

/// CLI entry point for `choff segments <id>`.
pub async fn run_segments(config: &Config, conversation_id: i64) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let segments = get_segments(&store, conversation_id).await;
    pool.close().await;
    let segments = segments?;

    println!("--- Conversation {} ({} segments) ---", conversation_id, segments.len());
    for s in &segments {
        println!(
            "[{}] {} / {} / {} / {}",
            s.id,
            label(s.content_type),
            label(s.insight_type),
            label(s.pattern_label),
            label(s.resonance_level)
        );
        println!("{}", s.content);
        println!();
    }
    Ok(())
}

/// CLI entry point for `choff annotations <id>`.
pub async fn run_annotations(config: &Config, conversation_id: i64) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let grouped = get_annotations(&store, conversation_id).await;
    pool.close().await;
    let grouped = grouped?;

    for (segment_id, annotations) in &grouped {
        println!("--- Segment {} ---", segment_id);
        for a in annotations {
            println!("{:<15} {}  {}", a.kind.as_str(), a.created_at, a.payload);
        }
    }
    Ok(())
}

fn label<L: std::fmt::Display>(value: Option<L>) -> String {
    value.map(|l| l.to_string()).unwrap_or_else(|| "-".to_string())
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::build_pipeline;
    use choff_core::store::memory::InMemoryStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_missing_conversation_is_not_found() {
        let store = InMemoryStore::new();
        let err = get_segments(&store, 99).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::NotFound { .. })
        ));
        assert!(get_annotations(&store, 99).await.is_err());
    }

    #[tokio::test]
    async fn test_conversation_without_segments_is_not_found() {
        let store = InMemoryStore::new();
        let id = store.create_conversation("interrupted").await.unwrap();
        let err = get_segments(&store, id).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::NotFound { .. })
        ));
        assert!(get_annotations(&store, id).await.is_err());
    }

    #[tokio::test]
    async fn test_annotations_grouped_per_segment() {
        let store = Arc::new(InMemoryStore::new());
        let pipeline = build_pipeline(&Config::default(), store.clone()).unwrap();
        let result = pipeline.process_conversation("A. B.").await.unwrap();

        let segments = get_segments(&*store, result.conversation_id)
            .await
            .unwrap();
        assert_eq!(segments.len(), 2);
        assert!(segments.iter().all(|s| s.pattern_label.is_some()));

        let grouped = get_annotations(&*store, result.conversation_id)
            .await
            .unwrap();
        assert_eq!(grouped.len(), 2);
        for annotations in grouped.values() {
            assert_eq!(annotations.len(), 2);
            assert_eq!(annotations[0].kind, AnnotationKind::Classification);
            assert_eq!(annotations[1].kind, AnnotationKind::Pattern);
        }
    }
}
