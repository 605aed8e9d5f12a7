//! HTTP API tests against a server bound to an ephemeral port.

use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;

use choff::config::Config;
use choff::ingest::build_pipeline;
use choff::server::{serve, AppState};
use choff::sqlite_store::SqliteStore;
use choff::{db, migrate};

async fn spawn_server() -> (TempDir, String) {
    let tmp = TempDir::new().unwrap();
    let mut config = Config::default();
    config.db.path = tmp.path().join("choff.sqlite");

    let pool = db::connect(&config).await.unwrap();
    migrate::apply_schema(&pool).await.unwrap();
    let pipeline = build_pipeline(&config, Arc::new(SqliteStore::new(pool))).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(serve(listener, AppState::new(pipeline)));
    (tmp, base)
}

#[tokio::test]
async fn test_health() {
    let (_tmp, base) = spawn_server().await;

    let body: serde_json::Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_create_then_read_conversation() {
    let (_tmp, base) = spawn_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/conversations", base))
        .json(&serde_json::json!({
            "text": "I analyze the pattern. Theory suggests connection.",
            "title": "Notes"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let result: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(result["segments_processed"], 2);
    let id = result["conversation_id"].as_i64().unwrap();

    let segments: serde_json::Value = client
        .get(format!("{}/conversations/{}/segments", base, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let segments = segments.as_array().unwrap();
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0]["content"], "I analyze the pattern");
    assert_eq!(segments[0]["content_type"], "analysis");
    assert_eq!(segments[1]["content_type"], "theory");
    assert!(segments[0].get("vector").is_none());

    let annotations: serde_json::Value = client
        .get(format!("{}/conversations/{}/annotations", base, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let grouped = annotations.as_object().unwrap();
    assert_eq!(grouped.len(), 2);
    let first = segments[0]["id"].as_i64().unwrap().to_string();
    let kinds: Vec<&str> = grouped[&first]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["classification", "pattern"]);
}

#[tokio::test]
async fn test_trailing_slash_post_accepted() {
    let (_tmp, base) = spawn_server().await;

    let resp = reqwest::Client::new()
        .post(format!("{}/conversations/", base))
        .json(&serde_json::json!({ "text": "One. Two." }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let result: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(result["segments_processed"], 2);
}

#[tokio::test]
async fn test_empty_text_is_bad_request() {
    let (_tmp, base) = spawn_server().await;

    let resp = reqwest::Client::new()
        .post(format!("{}/conversations", base))
        .json(&serde_json::json!({ "text": " . ." }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let (_tmp, base) = spawn_server().await;

    let resp = reqwest::Client::new()
        .post(format!("{}/conversations", base))
        .json(&serde_json::json!({ "body": "missing text field" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_unknown_conversation_is_not_found() {
    let (_tmp, base) = spawn_server().await;

    for path in ["segments", "annotations"] {
        let resp = reqwest::get(format!("{}/conversations/777/{}", base, path))
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["code"], "not_found");
    }
}
