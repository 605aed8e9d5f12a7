//! Core data models for the ingestion pipeline.
//!
//! Records ([`Conversation`], [`Segment`], [`Annotation`], [`CacheEntry`])
//! mirror what a [`Store`](crate::store::Store) persists. Result types
//! ([`Classification`], [`PatternResult`], [`ProcessResult`]) are what the
//! pipeline hands back to callers and serialize directly to the JSON
//! response shape.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Declares a fixed label set with its wire names.
///
/// Generates `as_str`, `ALL`, `Display` and `FromStr` so labels round-trip
/// through text columns and JSON identically.
macro_rules! label_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident => $wire:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            /// Every label, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    other => Err(Error::InvalidInput(format!(
                        "unknown {} label: '{}'",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}

label_enum! {
    /// What kind of content a segment carries.
    pub enum ContentType {
        Observation => "observation",
        Analysis => "analysis",
        Theory => "theory",
        Procedure => "procedure",
        CaseStudy => "case_study",
    }
}

label_enum! {
    /// How the insight in a segment arises.
    pub enum InsightType {
        Direct => "direct",
        Emergent => "emergent",
        Collective => "collective",
        Meta => "meta",
        Practical => "practical",
    }
}

label_enum! {
    /// Pattern label, both per match (`resonant` / `emerging`) and per
    /// segment (`resonant` / `theoretical`).
    pub enum PatternType {
        Resonant => "resonant",
        Emerging => "emerging",
        Theoretical => "theoretical",
    }
}

label_enum! {
    /// Strength of the strongest resonance found for a segment.
    pub enum ResonanceLevel {
        Strong => "strong",
        Emerging => "emerging",
    }
}

label_enum! {
    /// Annotation record kind.
    pub enum AnnotationKind {
        Classification => "classification",
        Pattern => "pattern",
    }
}

/// A conversation and its segments in insertion order.
#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    pub id: i64,
    pub title: String,
    /// Unix seconds.
    pub created_at: i64,
    pub segments: Vec<Segment>,
}

/// One delimiter-split unit of ingested text.
///
/// Every optional field starts unset and is written exactly once by the
/// pipeline stage that owns it.
#[derive(Debug, Clone, Serialize)]
pub struct Segment {
    pub id: i64,
    pub conversation_id: i64,
    /// Zero-based position within the conversation.
    pub position: i64,
    pub content: String,
    #[serde(skip)]
    pub vector: Option<Vec<f32>>,
    pub content_type: Option<ContentType>,
    pub insight_type: Option<InsightType>,
    pub pattern_label: Option<PatternType>,
    pub resonance_level: Option<ResonanceLevel>,
}

/// Append-only audit record attached to a segment.
#[derive(Debug, Clone, Serialize)]
pub struct Annotation {
    pub id: i64,
    pub segment_id: i64,
    pub kind: AnnotationKind,
    pub payload: serde_json::Value,
    /// Unix seconds.
    pub created_at: i64,
}

/// A cached vector keyed by the SHA-256 fingerprint of its text.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Lowercase hex SHA-256 of the exact text bytes.
    pub fingerprint: String,
    pub vector: Vec<f32>,
    pub model_tag: String,
}

/// Labels assigned to a segment by the [`Classifier`](crate::classifier::Classifier).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub content_type: ContentType,
    pub insight_type: InsightType,
}

/// A sibling segment whose similarity met the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResonanceMatch {
    pub sibling_id: i64,
    pub similarity: f32,
    pub pattern_type: PatternType,
}

/// Outcome of resonance detection for one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternResult {
    pub matches: Vec<ResonanceMatch>,
    pub pattern_type: PatternType,
    pub resonance_level: ResonanceLevel,
}

/// Per-segment entry of a [`ProcessResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentResult {
    pub segment_id: i64,
    #[serde(flatten)]
    pub classification: Classification,
    pub patterns: PatternResult,
}

/// Aggregate returned by a full pipeline pass over one conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessResult {
    pub conversation_id: i64,
    pub segments_processed: usize,
    pub classifications: Vec<SegmentResult>,
}
