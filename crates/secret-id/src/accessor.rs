//! Accessor index: opaque public handle to SecretID digest.
//!
//! Accessors let operators list and revoke SecretIDs without ever seeing the
//! SecretIDs themselves. Each accessor is a random UUIDv4; its entry is stored
//! under a keyed digest of the accessor so the storage layout does not reveal
//! live accessors either.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;
use warden_storage::{StorageBackend, StorageError};

use crate::{
    context::OperationContext,
    digest::KeyedDigest,
    entry::{AccessorEntry, SecretIdScope},
    error::{Result, SecretIdError},
    locks::SecretIdLocks,
};

/// Attempts at drawing an unused accessor before giving up.
const MAX_ACCESSOR_ATTEMPTS: usize = 4;

/// Maps accessors to the digests of the SecretIDs they stand for.
///
/// Every operation holds the accessor's stripe slot for its duration:
/// shared for [`resolve`](Self::resolve), exclusive for
/// [`create`](Self::create) and [`delete`](Self::delete).
#[derive(Debug, Clone)]
pub struct AccessorIndex<B> {
    backend: B,
    digest: KeyedDigest,
    locks: Arc<SecretIdLocks>,
}

impl<B: StorageBackend + Clone> AccessorIndex<B> {
    /// Creates an index over `backend` using the accessor stripe in `locks`.
    #[must_use]
    pub fn new(backend: B, digest: KeyedDigest, locks: Arc<SecretIdLocks>) -> Self {
        Self { backend, digest, locks }
    }

    /// Issues a new accessor for `secret_id_digest` and persists its entry.
    ///
    /// # Errors
    ///
    /// - [`SecretIdError::InvalidInput`] if `secret_id_digest` is empty.
    /// - [`SecretIdError::Storage`] if the backend fails.
    /// - [`SecretIdError::Cancelled`] / [`SecretIdError::DeadlineExceeded`].
    #[tracing::instrument(skip(self, ctx, secret_id_digest))]
    pub async fn create(
        &self,
        ctx: &OperationContext,
        scope: SecretIdScope,
        secret_id_digest: &str,
    ) -> Result<String> {
        if secret_id_digest.is_empty() {
            return Err(SecretIdError::InvalidInput("missing SecretID digest".into()));
        }

        let mut last_key = String::new();
        for _ in 0..MAX_ACCESSOR_ATTEMPTS {
            let accessor = Uuid::new_v4().to_string();
            let key = self.storage_key(scope, &accessor)?;
            let _guard = ctx.write(self.locks.accessor.lock_for(&accessor)).await?;

            let existing = ctx
                .run(self.backend.get(&key))
                .await?
                .map_err(|e| SecretIdError::storage("get", &key, e))?;
            if existing.is_some() {
                last_key = key;
                continue;
            }

            let entry = AccessorEntry { secret_id_digest: secret_id_digest.to_owned() };
            ctx.run(self.backend.put_json(key.clone(), &entry))
                .await?
                .map_err(|e| SecretIdError::storage("put", &key, e))?;

            debug!(%accessor, "created accessor entry");
            return Ok(accessor);
        }

        Err(SecretIdError::storage(
            "put",
            last_key,
            StorageError::internal("could not draw an unused accessor"),
        ))
    }

    /// Returns the SecretID digest `accessor` refers to.
    ///
    /// `None` covers both never-issued and already-deleted accessors.
    ///
    /// # Errors
    ///
    /// - [`SecretIdError::Storage`] if the backend fails or the entry is corrupt.
    /// - [`SecretIdError::Cancelled`] / [`SecretIdError::DeadlineExceeded`].
    #[tracing::instrument(skip(self, ctx))]
    pub async fn resolve(
        &self,
        ctx: &OperationContext,
        scope: SecretIdScope,
        accessor: &str,
    ) -> Result<Option<String>> {
        if accessor.is_empty() {
            return Ok(None);
        }
        let key = self.storage_key(scope, accessor)?;
        let _guard = ctx.read(self.locks.accessor.lock_for(accessor)).await?;

        let entry: Option<AccessorEntry> = ctx
            .run(self.backend.get_json(&key))
            .await?
            .map_err(|e| SecretIdError::storage("get", &key, e))?;
        Ok(entry.map(|e| e.secret_id_digest))
    }

    /// Deletes the entry for `accessor`. Deleting an unknown accessor succeeds.
    ///
    /// # Errors
    ///
    /// - [`SecretIdError::Storage`] if the backend fails.
    /// - [`SecretIdError::Cancelled`] / [`SecretIdError::DeadlineExceeded`].
    #[tracing::instrument(skip(self, ctx))]
    pub async fn delete(
        &self,
        ctx: &OperationContext,
        scope: SecretIdScope,
        accessor: &str,
    ) -> Result<()> {
        if accessor.is_empty() {
            return Ok(());
        }
        let key = self.storage_key(scope, accessor)?;
        let _guard = ctx.write(self.locks.accessor.lock_for(accessor)).await?;

        ctx.run(self.backend.delete(&key))
            .await?
            .map_err(|e| SecretIdError::storage("delete", &key, e))
    }

    /// Storage key for `accessor` in `scope`.
    ///
    /// # Errors
    ///
    /// [`SecretIdError::InvalidInput`] if the accessor is too long to digest.
    pub fn storage_key(&self, scope: SecretIdScope, accessor: &str) -> Result<String> {
        Ok(scope.accessor_key(&self.digest.digest(accessor)?))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use warden_storage::MemoryBackend;

    use super::*;

    fn index() -> (AccessorIndex<MemoryBackend>, MemoryBackend) {
        let backend = MemoryBackend::new();
        let digest = KeyedDigest::new(b"accessor-test-key".to_vec()).unwrap();
        let index = AccessorIndex::new(backend.clone(), digest, Arc::new(SecretIdLocks::default()));
        (index, backend)
    }

    #[tokio::test]
    async fn create_then_resolve_then_delete() {
        let (index, _) = index();
        let ctx = OperationContext::new();
        let scope = SecretIdScope::Replicated;

        let accessor = index.create(&ctx, scope, "digest-1").await.unwrap();
        let resolved = index.resolve(&ctx, scope, &accessor).await.unwrap();
        assert_eq!(resolved.as_deref(), Some("digest-1"));

        index.delete(&ctx, scope, &accessor).await.unwrap();
        assert_eq!(index.resolve(&ctx, scope, &accessor).await.unwrap(), None);

        // Idempotent.
        index.delete(&ctx, scope, &accessor).await.unwrap();
    }

    #[tokio::test]
    async fn accessors_are_uuids_and_not_stored_in_the_clear() {
        let (index, backend) = index();
        let ctx = OperationContext::new();

        let accessor = index.create(&ctx, SecretIdScope::Replicated, "d").await.unwrap();
        assert!(Uuid::parse_str(&accessor).is_ok(), "accessor {accessor} is not a UUID");

        let keys = backend.keys_with_prefix("accessor/");
        assert_eq!(keys.len(), 1);
        assert!(!keys[0].contains(&accessor));
        assert_eq!(keys[0], index.storage_key(SecretIdScope::Replicated, &accessor).unwrap());
    }

    #[tokio::test]
    async fn scopes_are_isolated() {
        let (index, _) = index();
        let ctx = OperationContext::new();

        let accessor = index.create(&ctx, SecretIdScope::Local, "d").await.unwrap();
        assert_eq!(index.resolve(&ctx, SecretIdScope::Replicated, &accessor).await.unwrap(), None);
        assert!(index.resolve(&ctx, SecretIdScope::Local, &accessor).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn unknown_and_empty_accessors_resolve_to_none() {
        let (index, _) = index();
        let ctx = OperationContext::new();
        let scope = SecretIdScope::Replicated;

        assert_eq!(index.resolve(&ctx, scope, "never-issued").await.unwrap(), None);
        assert_eq!(index.resolve(&ctx, scope, "").await.unwrap(), None);
    }

    #[tokio::test]
    async fn create_rejects_empty_digest() {
        let (index, backend) = index();
        let result = index.create(&OperationContext::new(), SecretIdScope::Replicated, "").await;
        assert!(matches!(result, Err(SecretIdError::InvalidInput(_))));
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn cancelled_context_writes_nothing() {
        let (index, backend) = index();
        let ctx = OperationContext::new();
        ctx.cancel();

        let result = index.create(&ctx, SecretIdScope::Replicated, "d").await;
        assert!(matches!(result, Err(SecretIdError::Cancelled)));
        assert!(backend.is_empty());
    }
}
