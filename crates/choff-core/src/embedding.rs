//! Hashing embedder, cached embedding engine and vector utilities.
//!
//! [`HashingEmbedder`] builds a fixed-dimension sketch of a text: every
//! lower-cased whitespace token is hashed (SHA-256) into one of `dims`
//! buckets and contributes `1 / (position + 1)`, so earlier tokens weigh
//! more. The accumulator is then L2-normalized. The result is deterministic
//! and order-sensitive, and different tokens may collide in one bucket.
//!
//! [`EmbeddingEngine`] puts a [`VectorCache`] in front of the embedder.
//!
//! Also provides:
//! - [`cosine_similarity`]: similarity between two vectors, rejecting zero vectors
//! - [`vec_to_blob`] / [`blob_to_vec`]: little-endian f32 BLOB encoding for SQLite

use anyhow::Result;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::VectorCache;
use crate::error::Error;

/// Default vector dimensionality.
pub const DEFAULT_DIMS: usize = 100;

/// Default tag recorded with cached vectors.
pub const DEFAULT_MODEL_TAG: &str = "simple_embedding";

/// Trait for embedding providers.
///
/// Describes the model a vector came from, so cached entries and stored
/// segment vectors can be attributed.
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"simple_embedding"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `100`).
    fn dims(&self) -> usize;
}

/// Deterministic token-hashing embedder.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    model: String,
    dims: usize,
}

impl HashingEmbedder {
    /// Create an embedder producing `dims`-length vectors.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when `dims` is zero.
    pub fn new(model: impl Into<String>, dims: usize) -> Result<Self, Error> {
        if dims == 0 {
            return Err(Error::InvalidInput("embedding dims must be > 0".to_string()));
        }
        Ok(Self {
            model: model.into(),
            dims,
        })
    }

    /// Compute the vector for `text` without consulting any cache.
    ///
    /// Empty or whitespace-only text yields the zero vector, returned as-is.
    pub fn text_to_vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dims];

        for (i, token) in text.to_lowercase().split_whitespace().enumerate() {
            vector[bucket(token, self.dims)] += 1.0 / (i as f32 + 1.0);
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in vector.iter_mut() {
                *x /= norm;
            }
        }

        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL_TAG.to_string(),
            dims: DEFAULT_DIMS,
        }
    }
}

impl EmbeddingProvider for HashingEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }
}

/// Bucket index for a token: its SHA-256 digest read as a big-endian
/// integer, reduced modulo `dims`.
fn bucket(token: &str, dims: usize) -> usize {
    let digest = Sha256::digest(token.as_bytes());
    let modulus = dims as u128;
    let rem = digest
        .iter()
        .fold(0u128, |acc, &byte| (acc * 256 + byte as u128) % modulus);
    rem as usize
}

/// Embedding with a cache in front.
#[derive(Clone)]
pub struct EmbeddingEngine {
    embedder: HashingEmbedder,
    cache: VectorCache,
    stale_dims_seen: Arc<AtomicBool>,
}

impl EmbeddingEngine {
    pub fn new(embedder: HashingEmbedder, cache: VectorCache) -> Self {
        Self {
            embedder,
            cache,
            stale_dims_seen: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn embedder(&self) -> &HashingEmbedder {
        &self.embedder
    }

    /// Return the vector for `text`, from the cache when present.
    ///
    /// On a miss the vector is computed and stored before it is returned.
    /// A cached vector whose length differs from the configured dimension
    /// (written under an earlier configuration) is ignored and the fresh
    /// vector is returned without overwriting the write-once entry. Only the
    /// first such hit per engine is logged at `warn`.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(cached) = self.cache.lookup(text).await? {
            if cached.len() == self.embedder.dims() {
                debug!(chars = text.len(), "embedding cache hit");
                return Ok(cached);
            }
            if self.stale_dims_seen.swap(true, Ordering::Relaxed) {
                debug!(
                    cached_dims = cached.len(),
                    dims = self.embedder.dims(),
                    "cached vector has stale dimension; recomputing"
                );
            } else {
                warn!(
                    cached_dims = cached.len(),
                    dims = self.embedder.dims(),
                    "cached vector has stale dimension; recomputing. \
                     Use a fresh database after changing embedding.dims"
                );
            }
            return Ok(self.embedder.text_to_vector(text));
        }

        debug!(chars = text.len(), "embedding cache miss");
        let vector = self.embedder.text_to_vector(text);
        self.cache.store(text, &vector).await?;
        Ok(vector)
    }
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// # Example
///
/// ```rust
/// use choff_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12); // 3 × 4 bytes
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two vectors.
///
/// ```text
///            a · b
/// cos(θ) = ─────────
///          ‖a‖ × ‖b‖
/// ```
///
/// # Errors
///
/// - [`Error::DimensionMismatch`] when the lengths differ.
/// - [`Error::DegenerateVector`] when either vector has zero norm
///   (including empty vectors). Callers that treat this as "not similar"
///   must handle it explicitly.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, Error> {
    if a.len() != b.len() {
        return Err(Error::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(Error::DegenerateVector);
    }

    Ok(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;
    use std::sync::Arc;

    fn engine(store: Arc<InMemoryStore>) -> EmbeddingEngine {
        EmbeddingEngine::new(
            HashingEmbedder::default(),
            VectorCache::new(store, DEFAULT_MODEL_TAG),
        )
    }

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[test]
    fn test_vector_has_fixed_dims() {
        let embedder = HashingEmbedder::default();
        assert_eq!(embedder.text_to_vector("a").len(), DEFAULT_DIMS);
        let long = "word ".repeat(5000);
        assert_eq!(embedder.text_to_vector(&long).len(), DEFAULT_DIMS);
    }

    #[test]
    fn test_vector_is_unit_length() {
        let v = HashingEmbedder::default().text_to_vector("Consciousness patterns emerge");
        assert!((norm(&v) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let v = HashingEmbedder::default().text_to_vector("   ");
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_case_insensitive_and_deterministic() {
        let embedder = HashingEmbedder::default();
        assert_eq!(
            embedder.text_to_vector("Hello World"),
            embedder.text_to_vector("hello   world")
        );
    }

    #[test]
    fn test_single_token_lands_in_its_bucket() {
        let embedder = HashingEmbedder::new("t", 7).unwrap();
        let v = embedder.text_to_vector("token");
        let idx = bucket("token", 7);
        assert_eq!(v[idx], 1.0);
        assert_eq!(v.iter().filter(|x| **x != 0.0).count(), 1);
    }

    #[test]
    fn test_zero_dims_rejected() {
        assert!(matches!(
            HashingEmbedder::new("t", 0),
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_cold_and_warm_embed_match_recompute() {
        let store = Arc::new(InMemoryStore::new());
        let engine = engine(store.clone());
        let text = "Test consciousness pattern";

        let cold = engine.embed(text).await.unwrap();
        let warm = engine.embed(text).await.unwrap();
        let pure = HashingEmbedder::default().text_to_vector(text);

        assert_eq!(cold, warm);
        assert_eq!(cold, pure);
        assert_eq!(store.cache_len(), 1);
    }

    #[tokio::test]
    async fn test_stale_cached_dimension_is_ignored() {
        let store = Arc::new(InMemoryStore::new());
        let cache = VectorCache::new(store.clone(), DEFAULT_MODEL_TAG);
        cache.store("text", &[1.0, 0.0]).await.unwrap();

        let engine = EmbeddingEngine::new(HashingEmbedder::default(), cache);
        assert!(!engine.stale_dims_seen.load(Ordering::Relaxed));
        let v = engine.embed("text").await.unwrap();
        assert_eq!(v.len(), DEFAULT_DIMS);
        assert!(engine.stale_dims_seen.load(Ordering::Relaxed));

        // Later stale hits still recompute; the write-once entry is untouched.
        let again = engine.clone().embed("text").await.unwrap();
        assert_eq!(again, v);
        assert_eq!(store.cache_len(), 1);
        assert!(engine.stale_dims_seen.load(Ordering::Relaxed));
    }

    #[test]
    fn test_vec_blob_roundtrip() {
        let vec = vec![1.0f32, -2.5, 3.125, 0.0, -0.001];
        assert_eq!(blob_to_vec(&vec_to_blob(&vec)), vec);
    }

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&v, &v).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let sim = cosine_similarity(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]).unwrap();
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn test_cosine_symmetric() {
        let embedder = HashingEmbedder::default();
        let a = embedder.text_to_vector("the theory proposes synchronization");
        let b = embedder.text_to_vector("meta cognitive processes form patterns");
        assert_eq!(
            cosine_similarity(&a, &b).unwrap(),
            cosine_similarity(&b, &a).unwrap()
        );
    }

    #[test]
    fn test_cosine_zero_vector_is_degenerate() {
        assert_eq!(
            cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]),
            Err(Error::DegenerateVector)
        );
        assert_eq!(cosine_similarity(&[], &[]), Err(Error::DegenerateVector));
    }

    #[test]
    fn test_cosine_different_lengths() {
        assert_eq!(
            cosine_similarity(&[1.0, 2.0], &[1.0]),
            Err(Error::DimensionMismatch { left: 2, right: 1 })
        );
    }
}
