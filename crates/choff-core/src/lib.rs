//! # CHOFF Core
//!
//! Shared, runtime-agnostic logic for the CHOFF ingestion pipeline: data
//! models, segmentation, the hashing embedder and its content-addressed
//! cache, keyword classification, resonance detection, and the pipeline
//! that sequences them over a [`store::Store`].
//!
//! This crate contains no tokio, sqlx, or filesystem I/O. Persistence is
//! reached only through the [`store::Store`] trait.
//!
//! ```text
//! raw text ─▶ segments ─▶ embed + classify ─▶ resonance ─▶ ProcessResult
//!                              │                  │
//!                              ▼                  ▼
//!                         VectorCache        annotations
//! ```

pub mod cache;
pub mod classifier;
pub mod embedding;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod resonance;
pub mod segment;
pub mod store;

pub use error::Error;
