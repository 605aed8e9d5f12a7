//! In-memory [`Store`] implementation for tests and embedding callers.
//!
//! Uses `HashMap` and `Vec` behind `std::sync::RwLock`. Ids are assigned
//! from a single counter per table, starting at 1.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::error::Error;
use crate::models::{
    Annotation, AnnotationKind, CacheEntry, ContentType, Conversation, InsightType, PatternType,
    ResonanceLevel, Segment,
};

use super::Store;

struct StoredConversation {
    title: String,
    created_at: i64,
}

#[derive(Default)]
struct Tables {
    conversations: HashMap<i64, StoredConversation>,
    segments: Vec<Segment>,
    annotations: Vec<Annotation>,
    next_conversation_id: i64,
    next_segment_id: i64,
    next_annotation_id: i64,
}

/// In-memory store.
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    cache: RwLock<HashMap<String, CacheEntry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Number of cache entries.
    pub fn cache_len(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

impl Tables {
    fn segment_mut(&mut self, id: i64) -> Result<&mut Segment> {
        self.segments
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| Error::not_found(format!("segment {}", id)).into())
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create_conversation(&self, title: &str) -> Result<i64> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        tables.next_conversation_id += 1;
        let id = tables.next_conversation_id;
        tables.conversations.insert(
            id,
            StoredConversation {
                title: title.to_string(),
                created_at: chrono::Utc::now().timestamp(),
            },
        );
        Ok(id)
    }

    async fn get_conversation(&self, id: i64) -> Result<Option<Conversation>> {
        let tables = self.tables.read().map_err(poisoned)?;
        Ok(tables.conversations.get(&id).map(|c| Conversation {
            id,
            title: c.title.clone(),
            created_at: c.created_at,
            segments: tables
                .segments
                .iter()
                .filter(|s| s.conversation_id == id)
                .cloned()
                .collect(),
        }))
    }

    async fn create_segment(&self, conversation_id: i64, content: &str) -> Result<i64> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        if !tables.conversations.contains_key(&conversation_id) {
            return Err(Error::not_found(format!("conversation {}", conversation_id)).into());
        }
        let position = tables
            .segments
            .iter()
            .filter(|s| s.conversation_id == conversation_id)
            .count() as i64;
        tables.next_segment_id += 1;
        let id = tables.next_segment_id;
        tables.segments.push(Segment {
            id,
            conversation_id,
            position,
            content: content.to_string(),
            vector: None,
            content_type: None,
            insight_type: None,
            pattern_label: None,
            resonance_level: None,
        });
        Ok(id)
    }

    async fn update_segment_vector(&self, id: i64, vector: &[f32]) -> Result<()> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        tables.segment_mut(id)?.vector = Some(vector.to_vec());
        Ok(())
    }

    async fn update_segment_classification(
        &self,
        id: i64,
        content_type: ContentType,
        insight_type: InsightType,
    ) -> Result<()> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        let segment = tables.segment_mut(id)?;
        segment.content_type = Some(content_type);
        segment.insight_type = Some(insight_type);
        Ok(())
    }

    async fn update_segment_pattern(
        &self,
        id: i64,
        pattern_label: PatternType,
        resonance_level: ResonanceLevel,
    ) -> Result<()> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        let segment = tables.segment_mut(id)?;
        segment.pattern_label = Some(pattern_label);
        segment.resonance_level = Some(resonance_level);
        Ok(())
    }

    async fn create_annotation(
        &self,
        segment_id: i64,
        kind: AnnotationKind,
        payload: &serde_json::Value,
    ) -> Result<i64> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        tables.segment_mut(segment_id)?;
        tables.next_annotation_id += 1;
        let id = tables.next_annotation_id;
        tables.annotations.push(Annotation {
            id,
            segment_id,
            kind,
            payload: payload.clone(),
            created_at: chrono::Utc::now().timestamp(),
        });
        Ok(id)
    }

    async fn query_segments_by_conversation(&self, conversation_id: i64) -> Result<Vec<Segment>> {
        let tables = self.tables.read().map_err(poisoned)?;
        let mut segments: Vec<Segment> = tables
            .segments
            .iter()
            .filter(|s| s.conversation_id == conversation_id)
            .cloned()
            .collect();
        segments.sort_by_key(|s| s.position);
        Ok(segments)
    }

    async fn query_annotations_by_segment(&self, segment_id: i64) -> Result<Vec<Annotation>> {
        let tables = self.tables.read().map_err(poisoned)?;
        Ok(tables
            .annotations
            .iter()
            .filter(|a| a.segment_id == segment_id)
            .cloned()
            .collect())
    }

    async fn get_cached_vector(&self, fingerprint: &str) -> Result<Option<Vec<f32>>> {
        let cache = self.cache.read().map_err(poisoned)?;
        Ok(cache.get(fingerprint).map(|e| e.vector.clone()))
    }

    async fn put_cached_vector(&self, entry: &CacheEntry) -> Result<()> {
        let mut cache = self.cache.write().map_err(poisoned)?;
        cache
            .entry(entry.fingerprint.clone())
            .or_insert_with(|| entry.clone());
        Ok(())
    }
}
