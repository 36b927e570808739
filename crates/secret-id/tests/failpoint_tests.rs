#![allow(clippy::expect_used, clippy::panic)]
//! Fail-point tests for the SecretID registry.
//!
//! These tests require the `failpoints` feature:
//! ```bash
//! cargo test -p warden-secret-id --features failpoints --test failpoint_tests
//! ```

use std::sync::Arc;

use chrono::TimeDelta;
use warden_secret_id::{
    KeyedDigest, OperationContext, RoleBinding, SecretIdEntry, SecretIdError, SecretIdRegistry,
    SecretIdScope, StaticSystemView,
};
use warden_storage::MemoryBackend;

const SCOPE: SecretIdScope = SecretIdScope::Replicated;

fn registry(backend: MemoryBackend) -> SecretIdRegistry<MemoryBackend> {
    SecretIdRegistry::builder()
        .backend(backend)
        .digest(KeyedDigest::new(b"failpoint-key".to_vec()).expect("valid key"))
        .system(Arc::new(StaticSystemView::new(TimeDelta::hours(1))))
        .build()
        .expect("registry should build")
}

async fn register(
    registry: &SecretIdRegistry<MemoryBackend>,
    secret_id: &str,
) -> Result<SecretIdEntry, SecretIdError> {
    registry
        .register(
            &OperationContext::new(),
            SCOPE,
            &RoleBinding::builder().name("web").build(),
            secret_id,
            SecretIdEntry::builder().build(),
        )
        .await
}

#[tokio::test]
async fn crash_between_accessor_and_entry_leaves_only_an_orphan() {
    let scenario = fail::FailScenario::setup();
    let backend = MemoryBackend::new();
    let registry = registry(backend.clone());
    let ctx = OperationContext::new();

    fail::cfg("registry-after-accessor-create", "return").expect("failed to configure fail point");
    let result = register(&registry, "sid").await;
    fail::remove("registry-after-accessor-create");

    assert!(matches!(result, Err(SecretIdError::Storage { .. })), "got {result:?}");
    assert_eq!(backend.keys_with_prefix(SCOPE.accessor_prefix()).len(), 1);
    assert!(backend.keys_with_prefix(SCOPE.secret_id_prefix()).is_empty());
    assert!(registry.read(&ctx, SCOPE, "web", "sid").await.expect("read").is_none());

    let stats = registry.tidy(&ctx, SCOPE).await.expect("tidy");
    assert_eq!(stats.orphaned_accessors_removed, 1);
    assert!(backend.is_empty());

    register(&registry, "sid").await.expect("registration after recovery");

    scenario.teardown();
}

#[tokio::test]
async fn backend_put_failure_surfaces_as_transient_storage_error() {
    let scenario = fail::FailScenario::setup();
    let backend = MemoryBackend::new();
    let registry = registry(backend.clone());

    fail::cfg("memory-put", "return").expect("failed to configure fail point");
    let result = register(&registry, "sid").await;
    fail::remove("memory-put");

    let err = result.expect_err("registration should fail");
    assert!(matches!(err, SecretIdError::Storage { operation: "put", .. }), "got {err:?}");
    assert!(err.is_transient());
    assert!(backend.is_empty());
    assert_eq!(registry.metrics().snapshot().storage_errors, 1);

    scenario.teardown();
}

#[tokio::test]
async fn list_failure_aborts_flush_before_any_delete() {
    let scenario = fail::FailScenario::setup();
    let backend = MemoryBackend::new();
    let registry = registry(backend.clone());
    register(&registry, "sid").await.expect("seed registration");

    fail::cfg("memory-list", "return").expect("failed to configure fail point");
    let result = registry.flush_role(&OperationContext::new(), SCOPE, "web").await;
    fail::remove("memory-list");

    assert!(matches!(result, Err(SecretIdError::Storage { operation: "list", .. })), "{result:?}");
    assert_eq!(backend.keys_with_prefix(SCOPE.secret_id_prefix()).len(), 1);

    scenario.teardown();
}
