//! Content-addressed vector cache.
//!
//! Maps the SHA-256 fingerprint of a text to the vector previously computed
//! for it. Entries are write-once and never evicted: the first writer for a
//! fingerprint wins and later writes of the same fingerprint are no-ops at
//! the store level.

use anyhow::Result;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::models::CacheEntry;
use crate::store::Store;

/// Lowercase hex SHA-256 of the exact UTF-8 bytes of `text`.
///
/// No normalization is applied: `"Foo"` and `"foo"` have different
/// fingerprints even though they embed identically.
pub fn fingerprint(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Vector cache backed by a [`Store`].
#[derive(Clone)]
pub struct VectorCache {
    store: Arc<dyn Store>,
    model_tag: String,
}

impl VectorCache {
    pub fn new(store: Arc<dyn Store>, model_tag: impl Into<String>) -> Self {
        Self {
            store,
            model_tag: model_tag.into(),
        }
    }

    /// Tag recorded with every entry this cache writes.
    pub fn model_tag(&self) -> &str {
        &self.model_tag
    }

    /// Return the cached vector for `text`, if any.
    pub async fn lookup(&self, text: &str) -> Result<Option<Vec<f32>>> {
        self.store.get_cached_vector(&fingerprint(text)).await
    }

    /// Record `vector` for `text`. Storing an already-cached text succeeds
    /// without creating a second entry.
    pub async fn store(&self, text: &str, vector: &[f32]) -> Result<()> {
        let entry = CacheEntry {
            fingerprint: fingerprint(text),
            vector: vector.to_vec(),
            model_tag: self.model_tag.clone(),
        };
        self.store.put_cached_vector(&entry).await
    }
}
