//! Integration tests for the routing state store
//!
//! The store is exercised against real files in temporary directories.

use serde_json::{json, Value};
use std::fs;
use switchyard_core::route::Route;
use switchyard_core::router::{RouteDecision, Scenario};
use switchyard_core::state::{load_state, RoutingStateStore, MAX_HISTORY_ENTRIES};
use tempfile::TempDir;

fn decision(n: usize) -> RouteDecision {
    RouteDecision::new(
        Route::new("openai", format!("gpt-{}", n % 3)),
        Scenario::Default,
        "default routing",
        n as u64,
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_records_are_not_lost() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("routing-state.json");
    let store = RoutingStateStore::open(&path);

    const N: usize = 200;
    let handles: Vec<_> = (0..N)
        .map(|n| {
            let store = store.clone();
            tokio::spawn(async move { store.record(decision(n)) })
        })
        .collect();
    for handle in handles {
        handle.await?;
    }
    store.flush().await?;

    let state = store.read().await?;
    assert_eq!(state.session.request_count, N as u64);
    assert_eq!(state.history.len(), N.min(MAX_HISTORY_ENTRIES));
    assert_eq!(state.session.model_breakdown.values().sum::<u64>(), N as u64);

    let on_disk = load_state(&path).await;
    assert_eq!(on_disk.session.request_count, N as u64);
    assert_eq!(on_disk.history.len(), MAX_HISTORY_ENTRIES);
    Ok(())
}

#[tokio::test]
async fn test_101st_entry_evicts_oldest() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let store = RoutingStateStore::open(dir.path().join("state.json"));

    for n in 0..=MAX_HISTORY_ENTRIES {
        store.record(RouteDecision::new(
            Route::new("openai", "gpt-4"),
            Scenario::Default,
            format!("request {n}"),
            0,
        ));
    }

    let history = store.history(None).await?;
    assert_eq!(history.len(), MAX_HISTORY_ENTRIES);
    assert_eq!(history[0].reason, "request 1");
    assert_eq!(history[MAX_HISTORY_ENTRIES - 1].reason, "request 100");

    let last_three = store.history(Some(3)).await?;
    let reasons: Vec<_> = last_three.iter().map(|d| d.reason.as_str()).collect();
    assert_eq!(reasons, vec!["request 98", "request 99", "request 100"]);
    assert_eq!(store.history(Some(0)).await?.len(), MAX_HISTORY_ENTRIES);
    Ok(())
}

#[tokio::test]
async fn test_missing_file_reads_empty_state() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("never-written.json");

    let store = RoutingStateStore::open(&path);
    let state = store.read().await?;
    assert_eq!(state.session.request_count, 0);
    assert!(state.last_request.is_none());
    assert!(state.history.is_empty());
    assert!(!path.exists());
    Ok(())
}

#[tokio::test]
async fn test_corrupt_file_reads_empty_state_and_is_replaced() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("state.json");
    fs::write(&path, r#"{"lastUpdated": 12, "history": "nope"#)?;

    assert_eq!(load_state(&path).await.session.request_count, 0);

    let store = RoutingStateStore::open(&path);
    assert!(store.read().await?.history.is_empty());

    store.record(decision(1));
    store.flush().await?;
    let raw: Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
    assert_eq!(raw["session"]["requestCount"], json!(1));
    Ok(())
}

#[tokio::test]
async fn test_unknown_fields_preserved_on_rewrite() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("state.json");
    let existing = json!({
        "lastUpdated": "2025-01-31T09:15:02.417Z",
        "lastRequest": null,
        "session": {
            "startTime": "2025-01-31T09:00:00.000Z",
            "requestCount": 7,
            "modelBreakdown": {"openai/gpt-4": 7}
        },
        "history": [],
        "statusLine": {"enabled": true}
    });
    fs::write(&path, serde_json::to_string_pretty(&existing)?)?;

    let store = RoutingStateStore::open(&path);
    store.record(RouteDecision::new(Route::new("openai", "gpt-4"), Scenario::Think, "reasoning requested", 5));
    store.flush().await?;

    let raw: Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
    assert_eq!(raw["statusLine"], json!({"enabled": true}));
    assert_eq!(raw["session"]["requestCount"], json!(8));
    assert_eq!(raw["session"]["modelBreakdown"]["openai/gpt-4"], json!(8));
    assert_eq!(raw["session"]["startTime"], json!("2025-01-31T09:00:00.000Z"));
    assert_eq!(raw["lastRequest"]["scenario"], json!("think"));
    assert_eq!(raw["history"][0]["reason"], json!("reasoning requested"));
    Ok(())
}

#[tokio::test]
async fn test_initialize_and_reload() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("state.json");
    let store = RoutingStateStore::open(&path);

    store.record(decision(0));
    store.record(decision(1));
    store.initialize().await?;
    assert_eq!(load_state(&path).await.session.request_count, 0);

    // Another writer replaces the document; reload picks it up
    let other = RoutingStateStore::open(dir.path().join("other.json"));
    other.record(decision(2));
    other.flush().await?;
    fs::copy(dir.path().join("other.json"), &path)?;

    store.reload().await?;
    let state = store.read().await?;
    assert_eq!(state.session.request_count, 1);
    assert_eq!(state.last_request.map(|d| d.model), Some("gpt-2".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_timestamps_sort_lexically() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("state.json");
    let store = RoutingStateStore::open(&path);
    for n in 0..5 {
        store.record(decision(n));
    }
    store.flush().await?;

    let raw: Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
    let stamps: Vec<&str> = raw["history"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["timestamp"].as_str().unwrap())
        .collect();
    let mut sorted = stamps.clone();
    sorted.sort();
    assert_eq!(stamps, sorted);
    Ok(())
}
