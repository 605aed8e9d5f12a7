//! Pairwise resonance detection within one conversation.
//!
//! A target segment is compared against every sibling by cosine similarity.
//! Matches at or above the threshold are kept; a match is `resonant` above
//! the strong cutoff and `emerging` otherwise. The cost is O(n) per segment
//! and O(n²) per conversation.

use tracing::warn;

use crate::embedding::cosine_similarity;
use crate::error::Error;
use crate::models::{PatternResult, PatternType, ResonanceLevel, ResonanceMatch, Segment};

/// Default similarity a sibling must reach to count as a match.
pub const DEFAULT_THRESHOLD: f32 = 0.8;

/// Default similarity above which a match is `resonant` / `strong`.
pub const DEFAULT_STRONG_CUTOFF: f32 = 0.9;

/// Scans a segment's siblings for similar vectors.
#[derive(Debug, Clone, Copy)]
pub struct ResonanceDetector {
    strong_cutoff: f32,
}

impl Default for ResonanceDetector {
    fn default() -> Self {
        Self::new(DEFAULT_STRONG_CUTOFF)
    }
}

impl ResonanceDetector {
    pub fn new(strong_cutoff: f32) -> Self {
        Self { strong_cutoff }
    }

    /// Detect resonance between `target` and `siblings`.
    ///
    /// `siblings` may include the target itself; it is skipped by id, as
    /// are siblings from another conversation and siblings without a
    /// vector. A zero vector on either side is treated as not similar.
    pub fn detect(&self, target: &Segment, siblings: &[Segment], threshold: f32) -> PatternResult {
        let mut matches = Vec::new();

        if let Some(target_vec) = target.vector.as_deref() {
            for sibling in siblings {
                if sibling.id == target.id || sibling.conversation_id != target.conversation_id {
                    continue;
                }
                let Some(sibling_vec) = sibling.vector.as_deref() else {
                    continue;
                };

                let similarity = match cosine_similarity(target_vec, sibling_vec) {
                    Ok(s) => s,
                    Err(Error::DegenerateVector) => continue,
                    Err(e) => {
                        warn!(
                            segment_id = target.id,
                            sibling_id = sibling.id,
                            error = %e,
                            "skipping incomparable sibling"
                        );
                        continue;
                    }
                };

                if similarity >= threshold {
                    matches.push(ResonanceMatch {
                        sibling_id: sibling.id,
                        similarity,
                        pattern_type: if similarity > self.strong_cutoff {
                            PatternType::Resonant
                        } else {
                            PatternType::Emerging
                        },
                    });
                }
            }
        }

        let pattern_type = if matches.is_empty() {
            PatternType::Theoretical
        } else {
            PatternType::Resonant
        };
        let resonance_level = if matches.iter().any(|m| m.similarity > self.strong_cutoff) {
            ResonanceLevel::Strong
        } else {
            ResonanceLevel::Emerging
        };

        PatternResult {
            matches,
            pattern_type,
            resonance_level,
        }
    }
}
