//! # choff
//!
//! Conversation segment analysis backed by SQLite.
//!
//! Text is split into segments, each segment gets a deterministic hashed
//! embedding (cached by content fingerprint) and a content/insight label,
//! and segments of the same conversation are compared by cosine similarity
//! to record resonance patterns.
//!
//! ```text
//! ┌──────────┐   ┌─────────────────────────────┐   ┌──────────┐
//! │ CLI/HTTP │──▶│ Pipeline (choff-core)       │──▶│  SQLite  │
//! │          │   │ segment → embed → classify  │   │  store   │
//! └──────────┘   │        → resonance          │   └──────────┘
//!                └─────────────────────────────┘
//! ```
//!
//! The algorithms live in [`choff_core`], which has no database or runtime
//! dependency. This crate adds configuration, the SQLite [`Store`]
//! implementation, the CLI commands, and the HTTP server.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite-backed [`Store`] |
//! | [`ingest`] | Pipeline construction and `choff process` |
//! | [`get`] | Segment and annotation queries |
//! | [`server`] | HTTP API |
//!
//! [`Store`]: choff_core::store::Store

pub mod config;
pub mod db;
pub mod get;
pub mod ingest;
pub mod migrate;
pub mod server;
pub mod sqlite_store;

pub use choff_core;
