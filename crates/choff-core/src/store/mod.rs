//! Storage abstraction for the ingestion pipeline.
//!
//! The [`Store`] trait defines every durable operation the pipeline needs,
//! so the same coordinator runs against SQLite in the application and an
//! in-memory store in tests.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{
    Annotation, AnnotationKind, CacheEntry, ContentType, Conversation, InsightType, PatternType,
    ResonanceLevel, Segment,
};

/// Abstract storage backend.
///
/// Records are keyed by integer ids assigned by the store. Update methods
/// fail with [`Error::NotFound`](crate::Error::NotFound) when the segment
/// does not exist.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`create_conversation`](Store::create_conversation) | Insert a conversation, return its id |
/// | [`get_conversation`](Store::get_conversation) | Conversation with its ordered segments |
/// | [`create_segment`](Store::create_segment) | Append a segment to a conversation |
/// | [`update_segment_vector`](Store::update_segment_vector) | Attach the segment vector |
/// | [`update_segment_classification`](Store::update_segment_classification) | Attach content/insight labels |
/// | [`update_segment_pattern`](Store::update_segment_pattern) | Attach pattern/resonance labels |
/// | [`create_annotation`](Store::create_annotation) | Append an annotation record |
/// | [`query_segments_by_conversation`](Store::query_segments_by_conversation) | Segments in insertion order |
/// | [`query_annotations_by_segment`](Store::query_annotations_by_segment) | Annotations in insertion order |
/// | [`get_cached_vector`](Store::get_cached_vector) | Cache lookup by fingerprint |
/// | [`put_cached_vector`](Store::put_cached_vector) | Write-once cache insert |
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_conversation(&self, title: &str) -> Result<i64>;

    async fn get_conversation(&self, id: i64) -> Result<Option<Conversation>>;

    /// Append a segment; its position is the number of segments already in
    /// the conversation.
    async fn create_segment(&self, conversation_id: i64, content: &str) -> Result<i64>;

    async fn update_segment_vector(&self, id: i64, vector: &[f32]) -> Result<()>;

    async fn update_segment_classification(
        &self,
        id: i64,
        content_type: ContentType,
        insight_type: InsightType,
    ) -> Result<()>;

    async fn update_segment_pattern(
        &self,
        id: i64,
        pattern_label: PatternType,
        resonance_level: ResonanceLevel,
    ) -> Result<()>;

    async fn create_annotation(
        &self,
        segment_id: i64,
        kind: AnnotationKind,
        payload: &serde_json::Value,
    ) -> Result<i64>;

    /// Segments of a conversation in insertion order. Unknown ids yield an
    /// empty list.
    async fn query_segments_by_conversation(&self, conversation_id: i64) -> Result<Vec<Segment>>;

    async fn query_annotations_by_segment(&self, segment_id: i64) -> Result<Vec<Annotation>>;

    async fn get_cached_vector(&self, fingerprint: &str) -> Result<Option<Vec<f32>>>;

    /// Insert a cache entry unless its fingerprint is already present, in
    /// which case this is a successful no-op.
    async fn put_cached_vector(&self, entry: &CacheEntry) -> Result<()>;
}
