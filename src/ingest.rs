//! Pipeline construction and the `choff process` command.
//!
//! [`build_pipeline`] wires the configured embedder, cache, classifier and
//! resonance detector around a [`Store`]. It is called once per process
//! (CLI run or server start) and the resulting [`Pipeline`] is shared.

use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use choff_core::cache::VectorCache;
use choff_core::embedding::{EmbeddingEngine, HashingEmbedder};
use choff_core::models::ProcessResult;
use choff_core::pipeline::Pipeline;
use choff_core::resonance::ResonanceDetector;
use choff_core::store::Store;

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::sqlite_store::SqliteStore;

/// Build a [`Pipeline`] over `store` from configuration.
pub fn build_pipeline(config: &Config, store: Arc<dyn Store>) -> Result<Pipeline> {
    let embedder = HashingEmbedder::new(config.embedding.model.clone(), config.embedding.dims)?;
    let cache = VectorCache::new(store.clone(), config.embedding.model.clone());
    let classifier = config.classifier.build()?;

    Ok(Pipeline::new(
        store,
        EmbeddingEngine::new(embedder, cache),
        Arc::new(classifier),
        ResonanceDetector::new(config.resonance.strong_cutoff),
    )
    .with_threshold(config.resonance.threshold))
}

/// CLI entry point: read text from `input` (or stdin), process it as a new
/// conversation, and print the outcome.
pub async fn run_process(
    config: &Config,
    input: Option<&Path>,
    threshold: Option<f32>,
    title: Option<&str>,
    json: bool,
) -> Result<()> {
    let text = match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read text from stdin")?;
            buf
        }
    };

    if let Some(t) = threshold {
        if !(-1.0..=1.0).contains(&t) {
            anyhow::bail!("--threshold must be in [-1.0, 1.0]");
        }
    }

    let pool = db::connect(config).await?;
    migrate::apply_schema(&pool).await?;
    let store: Arc<dyn Store> = Arc::new(SqliteStore::new(pool.clone()));
    let mut pipeline = build_pipeline(config, store)?;
    if let Some(t) = threshold {
        pipeline = pipeline.with_threshold(t);
    }

    let result = pipeline.process_conversation_titled(&text, title).await;
    pool.close().await;
    let result = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result);
    }
    Ok(())
}

fn print_summary(result: &ProcessResult) {
    println!("process");
    println!("  conversation: {}", result.conversation_id);
    println!("  segments processed: {}", result.segments_processed);
    for entry in &result.classifications {
        println!(
            "  [{}] {} / {}  pattern={} resonance={} matches={}",
            entry.segment_id,
            entry.classification.content_type,
            entry.classification.insight_type,
            entry.patterns.pattern_type,
            entry.patterns.resonance_level,
            entry.patterns.matches.len()
        );
    }
    println!("ok");
}
