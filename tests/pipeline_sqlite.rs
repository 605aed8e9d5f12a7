//! Pipeline runs against a real SQLite file.

use std::sync::Arc;
use tempfile::TempDir;

use choff::config::Config;
use choff::ingest::build_pipeline;
use choff::sqlite_store::SqliteStore;
use choff::{db, migrate};
use choff_core::models::{PatternType, ResonanceLevel};
use choff_core::store::Store;
use choff_core::Error;

async fn setup() -> (TempDir, Config, Arc<SqliteStore>) {
    let tmp = TempDir::new().unwrap();
    let mut config = Config::default();
    config.db.path = tmp.path().join("data/choff.sqlite");

    migrate::run_migrations(&config).await.unwrap();
    let pool = db::connect(&config).await.unwrap();
    (tmp, config, Arc::new(SqliteStore::new(pool)))
}

#[tokio::test]
async fn test_repeated_text_hits_cache_once() {
    let (_tmp, config, store) = setup().await;
    let pipeline = build_pipeline(&config, store.clone()).unwrap();

    let result = pipeline
        .process_conversation("same words here. same words here. same words here.")
        .await
        .unwrap();
    assert_eq!(result.segments_processed, 3);
    assert_eq!(store.cache_len().await.unwrap(), 1);

    pipeline
        .process_conversation("same words here.")
        .await
        .unwrap();
    assert_eq!(store.cache_len().await.unwrap(), 1);
}

#[tokio::test]
async fn test_vectors_survive_round_trip() {
    let (_tmp, config, store) = setup().await;
    let pipeline = build_pipeline(&config, store.clone()).unwrap();

    let first = pipeline
        .process_conversation("I observe changes. I observe changes.")
        .await
        .unwrap();
    for entry in &first.classifications {
        assert_eq!(entry.patterns.pattern_type, PatternType::Resonant);
        assert_eq!(entry.patterns.resonance_level, ResonanceLevel::Strong);
        assert_eq!(entry.patterns.matches.len(), 1);
    }

    let segments = store
        .query_segments_by_conversation(first.conversation_id)
        .await
        .unwrap();
    let positions: Vec<i64> = segments.iter().map(|s| s.position).collect();
    assert_eq!(positions, vec![0, 1]);
    let vector = segments[0].vector.as_ref().unwrap();
    assert_eq!(vector.len(), config.embedding.dims);
    assert_eq!(segments[0].vector, segments[1].vector);
}

#[tokio::test]
async fn test_results_deterministic_across_pools() {
    let (tmp, config, store) = setup().await;
    let text = "I analyze the pattern. Theory suggests connection. I observe changes.";

    let a = build_pipeline(&config, store.clone())
        .unwrap()
        .process_conversation(text)
        .await
        .unwrap();
    store.pool().close().await;

    let pool = db::connect(&config).await.unwrap();
    let reopened = Arc::new(SqliteStore::new(pool));
    let b = build_pipeline(&config, reopened)
        .unwrap()
        .process_conversation(text)
        .await
        .unwrap();

    assert_ne!(a.conversation_id, b.conversation_id);
    assert_eq!(a.segments_processed, b.segments_processed);
    for (x, y) in a.classifications.iter().zip(&b.classifications) {
        assert_eq!(x.classification, y.classification);
        assert_eq!(x.patterns.pattern_type, y.patterns.pattern_type);
        assert_eq!(x.patterns.matches.len(), y.patterns.matches.len());
    }
    drop(tmp);
}

#[tokio::test]
async fn test_unknown_segment_update_is_not_found() {
    let (_tmp, _config, store) = setup().await;

    let err = store.update_segment_vector(999, &[0.5, 0.5]).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::NotFound { .. })
    ));
    assert!(store.get_conversation(999).await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_conversations_share_one_store() {
    let (_tmp, config, store) = setup().await;
    let pipeline = build_pipeline(&config, store.clone()).unwrap();

    const RUNS: usize = 24;
    let mut handles = Vec::with_capacity(RUNS);
    for i in 0..RUNS {
        let pipeline = pipeline.clone();
        let text = format!(
            "Shared opening line. Unique point number {}. Shared closing line.",
            i
        );
        handles.push(tokio::spawn(async move {
            pipeline.process_conversation(&text).await
        }));
    }

    let mut conversation_ids = Vec::with_capacity(RUNS);
    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.segments_processed, 3);
        conversation_ids.push(result.conversation_id);
    }

    conversation_ids.sort_unstable();
    conversation_ids.dedup();
    assert_eq!(conversation_ids.len(), RUNS);

    for id in conversation_ids {
        let segments = store.query_segments_by_conversation(id).await.unwrap();
        let positions: Vec<i64> = segments.iter().map(|s| s.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
        assert_eq!(segments[0].content, "Shared opening line");
        assert!(segments[1].content.starts_with("Unique point number"));
        assert_eq!(segments[2].content, "Shared closing line");
        assert!(segments.iter().all(|s| s.vector.is_some()));
        assert!(segments.iter().all(|s| s.pattern_label.is_some()));
    }

    // Two shared texts plus one unique text per run, whichever writer won.
    assert_eq!(store.cache_len().await.unwrap(), (RUNS + 2) as i64);
}
