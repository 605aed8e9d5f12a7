//! Error taxonomy for the ingestion pipeline.
//!
//! Store and pipeline operations return `anyhow::Result`; when one of these
//! variants is the root cause, callers recover it with
//! `anyhow::Error::downcast_ref::<Error>()` to pick a status code or exit
//! message.

use thiserror::Error;

/// Pipeline error type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A referenced conversation or segment does not exist.
    #[error("{resource} not found")]
    NotFound {
        /// Human-readable name of the missing record (e.g. `"segment 7"`).
        resource: String,
    },

    /// Input that cannot be processed, such as text with no segments.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Cosine similarity requested for a zero vector.
    #[error("degenerate vector: similarity is undefined for a zero vector")]
    DegenerateVector,

    /// Two vectors of different lengths were compared.
    #[error("dimension mismatch: {left} != {right}")]
    DimensionMismatch { left: usize, right: usize },
}

impl Error {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Error::NotFound {
            resource: resource.into(),
        }
    }
}

/// Result type alias for operations that fail with a pipeline [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
