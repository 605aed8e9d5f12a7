//! Pipeline coordinator.
//!
//! Runs one conversation through every stage in a fixed order:
//!
//! 1. split the text and create the conversation and its segments;
//! 2. for each segment in order: embed, attach the vector, classify, and
//!    record a `classification` annotation;
//! 3. once every segment has a vector, for each segment in order: detect
//!    resonance against its siblings and record a `pattern` annotation.
//!
//! Resonance only starts after stage 2 has finished for the whole
//! conversation, so results never depend on how far sibling processing has
//! progressed. Every store write is committed as it happens; an error
//! aborts the run and leaves earlier writes in place.

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

use crate::classifier::Classifier;
use crate::embedding::EmbeddingEngine;
use crate::models::{AnnotationKind, Classification, ProcessResult, SegmentResult};
use crate::resonance::{ResonanceDetector, DEFAULT_THRESHOLD};
use crate::segment::{derive_title, require_segments};
use crate::store::Store;

/// Sequences ingestion, embedding, classification and resonance detection.
///
/// Built once and shared; it holds no per-conversation state.
#[derive(Clone)]
pub struct Pipeline {
    store: Arc<dyn Store>,
    engine: EmbeddingEngine,
    classifier: Arc<Classifier>,
    detector: ResonanceDetector,
    threshold: f32,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn Store>,
        engine: EmbeddingEngine,
        classifier: Arc<Classifier>,
        detector: ResonanceDetector,
    ) -> Self {
        Self {
            store,
            engine,
            classifier,
            detector,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    /// Override the resonance threshold (default `0.8`).
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Process raw text as a new conversation titled after its first segment.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`](crate::Error::InvalidInput) when the text has
    /// no segments; store failures propagate unchanged.
    pub async fn process_conversation(&self, text: &str) -> Result<ProcessResult> {
        self.process_conversation_titled(text, None).await
    }

    /// Like [`process_conversation`](Self::process_conversation), with an
    /// explicit title when `title` is `Some`.
    pub async fn process_conversation_titled(
        &self,
        text: &str,
        title: Option<&str>,
    ) -> Result<ProcessResult> {
        let segments = require_segments(text)?;
        let title = match title {
            Some(t) => t.to_string(),
            None => derive_title(&segments[0]),
        };

        let conversation_id = self.store.create_conversation(&title).await?;
        let mut segment_ids = Vec::with_capacity(segments.len());
        for content in &segments {
            segment_ids.push(self.store.create_segment(conversation_id, content).await?);
        }
        info!(
            conversation_id,
            segments = segments.len(),
            "conversation ingested"
        );

        let mut classifications = Vec::with_capacity(segments.len());
        for (&segment_id, content) in segment_ids.iter().zip(&segments) {
            classifications.push(self.classify_segment(segment_id, content).await?);
        }

        // Every segment has a vector from here on.
        let siblings = self
            .store
            .query_segments_by_conversation(conversation_id)
            .await?;

        let mut results = Vec::with_capacity(siblings.len());
        for (segment, classification) in siblings.iter().zip(classifications) {
            let patterns = self.detector.detect(segment, &siblings, self.threshold);
            debug!(
                segment_id = segment.id,
                matches = patterns.matches.len(),
                pattern_type = %patterns.pattern_type,
                "resonance detected"
            );

            self.store
                .update_segment_pattern(segment.id, patterns.pattern_type, patterns.resonance_level)
                .await?;
            self.store
                .create_annotation(
                    segment.id,
                    AnnotationKind::Pattern,
                    &serde_json::to_value(&patterns)?,
                )
                .await?;

            results.push(SegmentResult {
                segment_id: segment.id,
                classification,
                patterns,
            });
        }

        info!(
            conversation_id,
            segments_processed = results.len(),
            "conversation processed"
        );

        Ok(ProcessResult {
            conversation_id,
            segments_processed: results.len(),
            classifications: results,
        })
    }

    async fn classify_segment(&self, segment_id: i64, content: &str) -> Result<Classification> {
        let vector = self.engine.embed(content).await?;
        self.store.update_segment_vector(segment_id, &vector).await?;

        let classification = self.classifier.classify(content);
        self.store
            .update_segment_classification(
                segment_id,
                classification.content_type,
                classification.insight_type,
            )
            .await?;
        self.store
            .create_annotation(
                segment_id,
                AnnotationKind::Classification,
                &serde_json::to_value(classification)?,
            )
            .await?;

        debug!(
            segment_id,
            content_type = %classification.content_type,
            insight_type = %classification.insight_type,
            "segment classified"
        );
        Ok(classification)
    }
}
