//! Partial failure tests.
//!
//! Storage writes fail part way through multi-step operations. The index must
//! never be left with a SecretID entry whose accessor is missing, and every
//! interrupted operation must be safe to run again.

#![allow(clippy::expect_used, clippy::panic)]

use std::sync::Arc;

use chrono::TimeDelta;
use warden_secret_id::{
    KeyedDigest, OperationContext, RoleBinding, SecretIdEntry, SecretIdError, SecretIdRegistry,
    SecretIdScope, StaticSystemView,
};
use warden_storage::{MemoryBackend, StorageBackend, StorageError, testutil::FailingBackend};

const SCOPE: SecretIdScope = SecretIdScope::Replicated;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn registry() -> (SecretIdRegistry<FailingBackend>, FailingBackend) {
    let backend = FailingBackend::new(MemoryBackend::new());
    let registry = SecretIdRegistry::builder()
        .backend(backend.clone())
        .digest(KeyedDigest::new(b"partial-failure-key".to_vec()).expect("valid key"))
        .system(Arc::new(StaticSystemView::new(TimeDelta::hours(1))))
        .build()
        .expect("registry should build");
    (registry, backend)
}

async fn register(
    registry: &SecretIdRegistry<FailingBackend>,
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

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn interrupted_flush_reports_progress_and_resumes() {
    let (registry, backend) = registry();
    let ctx = OperationContext::new();
    for i in 0..5 {
        register(&registry, &format!("sid-{i}")).await.expect("seed registration");
    }

    backend.fail_deletes_after(2);
    let err = registry.flush_role(&ctx, SCOPE, "web").await.expect_err("flush should stop");
    match &err {
        SecretIdError::FlushIncomplete { deleted, source } => {
            assert_eq!(*deleted, 2);
            let cause = source.as_ref();
            assert!(
                matches!(
                    cause,
                    SecretIdError::Storage {
                        operation: "delete",
                        source: StorageError::Connection { .. },
                        ..
                    }
                ),
                "unexpected cause: {cause:?}"
            );
        },
        other => panic!("expected FlushIncomplete, got {other:?}"),
    }
    assert!(err.is_transient());
    assert_eq!(backend.inner().keys_with_prefix(SCOPE.secret_id_prefix()).len(), 3);

    backend.heal();
    assert_eq!(registry.flush_role(&ctx, SCOPE, "web").await.expect("resumed flush"), 3);
    assert!(backend.inner().keys_with_prefix(SCOPE.secret_id_prefix()).is_empty());
    assert_eq!(registry.metrics().snapshot().flushed_entries, 5);
}

#[tokio::test]
async fn failed_accessor_write_leaves_nothing_behind() {
    let (registry, backend) = registry();
    backend.fail_puts_with_prefix(SCOPE.accessor_prefix());

    let err = register(&registry, "sid").await.expect_err("registration should fail");
    let SecretIdError::Storage { operation, key, .. } = &err else {
        panic!("expected a storage error, got {err:?}");
    };
    assert_eq!(*operation, "put");
    assert!(key.starts_with(SCOPE.accessor_prefix()), "failed on {key}");
    assert!(backend.inner().is_empty(), "no entry may exist without its accessor");
    assert_eq!(registry.metrics().snapshot().storage_errors, 1);

    backend.heal();
    register(&registry, "sid").await.expect("retry after heal should succeed");
}

#[tokio::test]
async fn failed_entry_write_removes_the_new_accessor() {
    let (registry, backend) = registry();
    backend.fail_puts_with_prefix(SCOPE.secret_id_prefix());

    let err = register(&registry, "sid").await.expect_err("registration should fail");
    assert!(matches!(err, SecretIdError::Storage { operation: "put", .. }), "{err:?}");
    assert!(backend.inner().is_empty(), "the accessor of an unwritten entry must be removed");

    backend.heal();
    let entry = register(&registry, "sid").await.expect("retry after heal should succeed");
    assert_eq!(
        registry.list_accessors(&OperationContext::new(), SCOPE, "web").await.expect("list"),
        vec![entry.accessor]
    );
}

#[tokio::test]
async fn destroy_with_failed_accessor_delete_is_recoverable() {
    let (registry, backend) = registry();
    let ctx = OperationContext::new();
    let entry = register(&registry, "sid").await.expect("seed registration");

    // Entry delete succeeds, accessor delete fails.
    backend.fail_deletes_after(1);
    let err = registry.destroy(&ctx, SCOPE, "web", "sid").await.expect_err("destroy should fail");
    assert!(matches!(err, SecretIdError::Storage { operation: "delete", .. }), "{err:?}");
    assert!(registry.read(&ctx, SCOPE, "web", "sid").await.expect("read").is_none());

    backend.heal();
    let stats = registry.tidy(&ctx, SCOPE).await.expect("tidy");
    assert_eq!(stats.orphaned_accessors_removed, 1);
    let resolved = registry.accessors().resolve(&ctx, SCOPE, &entry.accessor).await;
    assert!(resolved.expect("resolve").is_none());
}

#[tokio::test]
async fn failed_upgrade_write_is_reported() {
    let (registry, backend) = registry();
    let ctx = OperationContext::new();
    register(&registry, "sid").await.expect("seed registration");

    let key = format!(
        "{}{}/{}",
        SCOPE.secret_id_prefix(),
        registry.role_digest("web").expect("digest"),
        registry.secret_id_digest("sid").expect("digest"),
    );
    let mut stale: SecretIdEntry =
        backend.inner().get_json(&key).await.expect("get").expect("present");
    stale.legacy_num_uses = 2;
    backend.inner().put_json(key, &stale).await.expect("put");

    backend.fail_puts_after(0);
    let err = registry.read(&ctx, SCOPE, "web", "sid").await.expect_err("upgrade write fails");
    assert!(matches!(err, SecretIdError::Storage { operation: "put", .. }), "{err:?}");

    backend.heal();
    let entry = registry.read(&ctx, SCOPE, "web", "sid").await.expect("read").expect("present");
    assert_eq!(entry.num_uses, 2);
}
