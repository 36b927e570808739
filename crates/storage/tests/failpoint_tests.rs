#![allow(clippy::expect_used, clippy::panic)]
//! Fail points inside `MemoryBackend`.
//!
//! Run with:
//! ```bash
//! cargo test -p warden-storage --features failpoints --test failpoint_tests
//! ```

use warden_storage::{MemoryBackend, StorageBackend, StorageError};

const ENTRY: &str = "secret_id/role/sid";

async fn seeded() -> MemoryBackend {
    let store = MemoryBackend::new();
    store.put(ENTRY.to_owned(), b"{}".to_vec()).await.expect("seed");
    store
}

#[tokio::test]
async fn failed_put_stores_nothing() {
    let scenario = fail::FailScenario::setup();
    let store = MemoryBackend::new();

    fail::cfg("memory-put", "return").expect("configure memory-put");
    let outcome = store.put(ENTRY.to_owned(), b"{}".to_vec()).await;
    fail::remove("memory-put");

    assert!(matches!(outcome, Err(StorageError::Connection { .. })), "got {outcome:?}");
    assert!(outcome.is_err_and(|e| e.is_transient()));
    assert!(store.is_empty());

    scenario.teardown();
}

#[tokio::test]
async fn failed_delete_keeps_the_entry() {
    let scenario = fail::FailScenario::setup();
    let store = seeded().await;

    fail::cfg("memory-delete", "return").expect("configure memory-delete");
    let outcome = store.delete(ENTRY).await;
    fail::remove("memory-delete");

    assert!(outcome.is_err());
    assert!(store.get(ENTRY).await.expect("get").is_some());

    scenario.teardown();
}

#[tokio::test]
async fn read_side_fail_points() {
    let scenario = fail::FailScenario::setup();
    let store = seeded().await;

    fail::cfg("memory-get", "return").expect("configure memory-get");
    fail::cfg("memory-list", "return").expect("configure memory-list");
    assert!(store.get(ENTRY).await.is_err());
    assert!(store.list("secret_id/").await.is_err());
    fail::remove("memory-get");
    fail::remove("memory-list");

    assert!(store.get(ENTRY).await.expect("get").is_some());
    assert_eq!(store.list("secret_id/").await.expect("list"), vec!["role/"]);

    scenario.teardown();
}

#[tokio::test]
async fn health_check_follows_its_fail_point() {
    let scenario = fail::FailScenario::setup();
    let store = MemoryBackend::new();

    store.health_check().await.expect("healthy by default");
    fail::cfg("memory-health-check", "return").expect("configure memory-health-check");
    assert!(matches!(store.health_check().await, Err(StorageError::Internal { .. })));

    scenario.teardown();
}
