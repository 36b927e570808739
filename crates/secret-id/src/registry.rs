//! The SecretID registry.
//!
//! Ties the digest, lock stripes, accessor index and TTL policy together over
//! a [`StorageBackend`]. The backend offers no transactions, so every
//! multi-step operation is linearized by the locks in [`SecretIdLocks`]:
//!
//! - per-SecretID operations hold the SecretID's stripe slot,
//! - accessor writes nest inside that slot,
//! - role-wide enumeration holds the listing lock around both.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use chrono::TimeDelta;
//! use warden_secret_id::{
//!     KeyedDigest, OperationContext, RoleBinding, SecretIdEntry, SecretIdRegistry, SecretIdScope,
//!     StaticSystemView,
//! };
//! use warden_storage::MemoryBackend;
//!
//! # async fn example() -> warden_secret_id::Result<()> {
//! let registry = SecretIdRegistry::builder()
//!     .backend(MemoryBackend::new())
//!     .digest(KeyedDigest::new(b"per-mount key".to_vec())?)
//!     .system(Arc::new(StaticSystemView::new(TimeDelta::hours(24))))
//!     .build()?;
//!
//! let ctx = OperationContext::new();
//! let role = RoleBinding::builder().name("web").build();
//! let template = SecretIdEntry::builder().num_uses(1).build();
//!
//! let entry = registry
//!     .register(&ctx, SecretIdScope::Replicated, &role, "s.3f9a", template)
//!     .await?;
//! let found = registry
//!     .lookup_by_accessor(&ctx, SecretIdScope::Replicated, "web", &entry.accessor)
//!     .await?;
//! assert!(found.is_some());
//! # Ok(())
//! # }
//! ```

use std::{collections::HashSet, sync::Arc};

use chrono::Utc;
use tracing::{debug, info, warn};
use warden_storage::{StorageBackend, StorageError};

use crate::{
    accessor::AccessorIndex,
    cidr,
    config::SecretIdConfig,
    context::OperationContext,
    digest::KeyedDigest,
    entry::{SecretIdEntry, SecretIdScope},
    error::{Result, SecretIdError},
    locks::SecretIdLocks,
    metrics::SecretIdMetrics,
    ttl::{SystemView, effective_ttl},
};

/// The parts of a role definition the registry consults.
///
/// Owned by the role store; the registry only reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq, bon::Builder)]
pub struct RoleBinding {
    /// Role name. Stored only as a digest.
    #[builder(into)]
    pub name: String,
    /// Blocks every SecretID's `cidr_list` must stay inside. Empty allows any.
    #[builder(default)]
    pub bound_cidrs: Vec<String>,
    /// Blocks every SecretID's `token_bound_cidrs` must stay inside. Empty allows any.
    #[builder(default)]
    pub token_bound_cidrs: Vec<String>,
}

/// Outcome of a [`tidy`](SecretIdRegistry::tidy) pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TidyStats {
    /// Expired SecretID entries removed along with their accessors.
    pub expired_removed: usize,
    /// Accessor entries removed because no SecretID refers back to them.
    pub orphaned_accessors_removed: usize,
    /// SecretID entries left in place.
    pub retained: usize,
}

/// Issues, resolves and revokes SecretIDs.
///
/// Cheap to share behind an [`Arc`]; all methods take `&self`.
pub struct SecretIdRegistry<B> {
    backend: B,
    digest: KeyedDigest,
    locks: Arc<SecretIdLocks>,
    accessors: AccessorIndex<B>,
    system: Arc<dyn SystemView>,
    config: SecretIdConfig,
    metrics: SecretIdMetrics,
}

#[bon::bon]
impl<B: StorageBackend + Clone> SecretIdRegistry<B> {
    /// Creates a registry.
    ///
    /// `locks` defaults to a fresh set sized from `config`. Pass a shared set
    /// when several registries serve the same storage.
    ///
    /// # Errors
    ///
    /// Returns [`SecretIdError::Config`] if `config` asks for zero lock slots.
    #[builder]
    pub fn new(
        backend: B,
        digest: KeyedDigest,
        system: Arc<dyn SystemView>,
        #[builder(default)] config: SecretIdConfig,
        locks: Option<Arc<SecretIdLocks>>,
        #[builder(default)] metrics: SecretIdMetrics,
    ) -> Result<Self> {
        let locks = match locks {
            Some(locks) => locks,
            None => Arc::new(SecretIdLocks::new(&config)?),
        };
        let accessors = AccessorIndex::new(backend.clone(), digest.clone(), Arc::clone(&locks));
        Ok(Self { backend, digest, locks, accessors, system, config, metrics })
    }

    /// The accessor index this registry writes through.
    #[must_use]
    pub fn accessors(&self) -> &AccessorIndex<B> {
        &self.accessors
    }

    /// Operation counters.
    #[must_use]
    pub fn metrics(&self) -> &SecretIdMetrics {
        &self.metrics
    }

    /// The locks this registry serializes on.
    #[must_use]
    pub fn locks(&self) -> &Arc<SecretIdLocks> {
        &self.locks
    }

    /// Digest of `role`, the first path segment of its entries' keys.
    ///
    /// # Errors
    ///
    /// Returns [`SecretIdError::InvalidInput`] if `role` is empty or too long.
    pub fn role_digest(&self, role: &str) -> Result<String> {
        if role.is_empty() {
            return Err(SecretIdError::InvalidInput("missing role name".into()));
        }
        Ok(self.digest.digest(role)?)
    }

    /// Digest of `secret_id`, the storage identity of its entry.
    ///
    /// # Errors
    ///
    /// Returns [`SecretIdError::InvalidInput`] if `secret_id` is empty or too long.
    pub fn secret_id_digest(&self, secret_id: &str) -> Result<String> {
        if secret_id.is_empty() {
            return Err(SecretIdError::InvalidInput("missing secret_id".into()));
        }
        Ok(self.digest.digest(secret_id)?)
    }

    /// Registers `secret_id` for `role` and returns the stored entry.
    ///
    /// `template` supplies the use count, requested TTL, metadata and CIDR
    /// lists; timestamps and the accessor are assigned here. The TTL is
    /// bounded by the system ceiling. The accessor entry is written before
    /// the SecretID entry, so a reader that finds the SecretID always finds
    /// its accessor.
    ///
    /// # Errors
    ///
    /// - [`SecretIdError::InvalidInput`] for an empty or oversized role or SecretID.
    /// - [`SecretIdError::InvalidCidr`] / [`SecretIdError::CidrNotSubset`] if
    ///   the template's CIDRs are unparseable or escape the role's bounds.
    /// - [`SecretIdError::AlreadyRegistered`] if the SecretID exists for the role.
    /// - [`SecretIdError::Storage`], [`SecretIdError::Cancelled`],
    ///   [`SecretIdError::DeadlineExceeded`].
    #[tracing::instrument(
        skip(self, ctx, role, secret_id, template),
        fields(scope = ?scope, role = %role.name)
    )]
    pub async fn register(
        &self,
        ctx: &OperationContext,
        scope: SecretIdScope,
        role: &RoleBinding,
        secret_id: &str,
        template: SecretIdEntry,
    ) -> Result<SecretIdEntry> {
        let ctx = ctx.or_timeout(self.config.operation_timeout());
        let role_digest = self.role_digest(&role.name)?;
        let secret_id_digest = self.secret_id_digest(secret_id)?;

        cidr::parse_cidrs(&template.cidr_list)?;
        cidr::parse_cidrs(&template.token_bound_cidrs)?;
        cidr::verify_subset(&template.cidr_list, &role.bound_cidrs)?;
        cidr::verify_subset(&template.token_bound_cidrs, &role.token_bound_cidrs)?;

        let key = scope.entry_key(&role_digest, &secret_id_digest);
        let lock = self.locks.secret_id.lock_for(&secret_id_digest);

        {
            let _read = ctx.read(lock).await?;
            if self.exists(&ctx, &key).await? {
                return Err(self.duplicate());
            }
        }

        let _write = ctx.write(lock).await?;
        // Another registration may have won while no lock was held.
        if self.exists(&ctx, &key).await? {
            return Err(self.duplicate());
        }

        let mut entry = template;
        entry.stamp_created(Utc::now(), effective_ttl(entry.ttl, self.system.max_lease_ttl()));
        entry.accessor = self.observe(self.accessors.create(&ctx, scope, &secret_id_digest).await)?;

        fail::fail_point!("registry-after-accessor-create", |_| {
            Err(SecretIdError::storage(
                "put",
                key.clone(),
                StorageError::internal("injected failure before entry write"),
            ))
        });

        if let Err(err) = self.store(&ctx, key, &entry).await {
            if let Err(cleanup) = self.accessors.delete(&ctx, scope, &entry.accessor).await {
                warn!(
                    accessor = %entry.accessor,
                    error = %cleanup,
                    "failed to remove accessor of unwritten entry"
                );
            }
            return Err(err);
        }

        self.metrics.record_registration();
        debug!(accessor = %entry.accessor, expires_at = ?entry.expires_at, "registered SecretID");
        Ok(entry)
    }

    /// Reads the entry for `secret_id` under `role`.
    ///
    /// Entries whose deprecated use count is out of step are reconciled and
    /// written back before being returned.
    ///
    /// # Errors
    ///
    /// - [`SecretIdError::InvalidInput`] for an empty or oversized role or SecretID.
    /// - [`SecretIdError::Storage`], [`SecretIdError::Cancelled`],
    ///   [`SecretIdError::DeadlineExceeded`].
    #[tracing::instrument(skip(self, ctx, secret_id), fields(scope = ?scope))]
    pub async fn read(
        &self,
        ctx: &OperationContext,
        scope: SecretIdScope,
        role: &str,
        secret_id: &str,
    ) -> Result<Option<SecretIdEntry>> {
        let ctx = ctx.or_timeout(self.config.operation_timeout());
        let role_digest = self.role_digest(role)?;
        let secret_id_digest = self.secret_id_digest(secret_id)?;
        self.read_locked(&ctx, scope, &role_digest, &secret_id_digest, None).await
    }

    /// Reads an entry by its digests, as found through an accessor.
    ///
    /// # Errors
    ///
    /// Same as [`read`](Self::read).
    #[tracing::instrument(skip(self, ctx), fields(scope = ?scope))]
    pub async fn read_by_digest(
        &self,
        ctx: &OperationContext,
        scope: SecretIdScope,
        role_digest: &str,
        secret_id_digest: &str,
    ) -> Result<Option<SecretIdEntry>> {
        if role_digest.is_empty() || secret_id_digest.is_empty() {
            return Err(SecretIdError::InvalidInput("missing role or SecretID digest".into()));
        }
        let ctx = ctx.or_timeout(self.config.operation_timeout());
        self.read_locked(&ctx, scope, role_digest, secret_id_digest, None).await
    }

    /// Reads the entry `accessor` refers to, if it belongs to `role`.
    ///
    /// # Errors
    ///
    /// Same as [`read`](Self::read).
    #[tracing::instrument(skip(self, ctx), fields(scope = ?scope))]
    pub async fn lookup_by_accessor(
        &self,
        ctx: &OperationContext,
        scope: SecretIdScope,
        role: &str,
        accessor: &str,
    ) -> Result<Option<SecretIdEntry>> {
        let ctx = ctx.or_timeout(self.config.operation_timeout());
        let role_digest = self.role_digest(role)?;
        let Some(secret_id_digest) =
            self.observe(self.accessors.resolve(&ctx, scope, accessor).await)?
        else {
            return Ok(None);
        };
        self.read_locked(&ctx, scope, &role_digest, &secret_id_digest, Some(accessor)).await
    }

    /// Overwrites an existing entry. Returns `false` if there was none.
    ///
    /// The stored accessor and creation time are kept, `last_updated_at` is
    /// stamped, and the deprecated use count is lowered to the canonical one
    /// if it is larger. Used to persist a decremented use count.
    ///
    /// # Errors
    ///
    /// - [`SecretIdError::InvalidInput`] for an empty role or digest.
    /// - [`SecretIdError::Storage`], [`SecretIdError::Cancelled`],
    ///   [`SecretIdError::DeadlineExceeded`].
    #[tracing::instrument(skip(self, ctx, entry), fields(scope = ?scope))]
    pub async fn update(
        &self,
        ctx: &OperationContext,
        scope: SecretIdScope,
        role: &str,
        secret_id_digest: &str,
        mut entry: SecretIdEntry,
    ) -> Result<bool> {
        if secret_id_digest.is_empty() {
            return Err(SecretIdError::InvalidInput("missing SecretID digest".into()));
        }
        let ctx = ctx.or_timeout(self.config.operation_timeout());
        let role_digest = self.role_digest(role)?;
        let key = scope.entry_key(&role_digest, secret_id_digest);

        let _write = ctx.write(self.locks.secret_id.lock_for(secret_id_digest)).await?;
        let Some(existing) = self.load(&ctx, &key).await? else {
            return Ok(false);
        };

        entry.accessor = existing.accessor;
        entry.created_at = existing.created_at;
        entry.last_updated_at = Utc::now();
        entry.legacy_num_uses = entry.legacy_num_uses.min(entry.num_uses);
        self.store(&ctx, key, &entry).await?;
        Ok(true)
    }

    /// Revokes `secret_id` under `role`. Returns `false` if it was not registered.
    ///
    /// # Errors
    ///
    /// - [`SecretIdError::InvalidInput`] for an empty or oversized role or SecretID.
    /// - [`SecretIdError::Storage`], [`SecretIdError::Cancelled`],
    ///   [`SecretIdError::DeadlineExceeded`].
    #[tracing::instrument(skip(self, ctx, secret_id), fields(scope = ?scope))]
    pub async fn destroy(
        &self,
        ctx: &OperationContext,
        scope: SecretIdScope,
        role: &str,
        secret_id: &str,
    ) -> Result<bool> {
        let ctx = ctx.or_timeout(self.config.operation_timeout());
        let role_digest = self.role_digest(role)?;
        let secret_id_digest = self.secret_id_digest(secret_id)?;
        self.destroy_locked(&ctx, scope, &role_digest, &secret_id_digest, None).await
    }

    /// Revokes the SecretID `accessor` refers to, if it belongs to `role`.
    ///
    /// Returns `false` for unknown accessors and for accessors of other roles.
    ///
    /// # Errors
    ///
    /// Same as [`destroy`](Self::destroy).
    #[tracing::instrument(skip(self, ctx), fields(scope = ?scope))]
    pub async fn destroy_by_accessor(
        &self,
        ctx: &OperationContext,
        scope: SecretIdScope,
        role: &str,
        accessor: &str,
    ) -> Result<bool> {
        let ctx = ctx.or_timeout(self.config.operation_timeout());
        let role_digest = self.role_digest(role)?;
        let Some(secret_id_digest) =
            self.observe(self.accessors.resolve(&ctx, scope, accessor).await)?
        else {
            return Ok(false);
        };
        self.destroy_locked(&ctx, scope, &role_digest, &secret_id_digest, Some(accessor)).await
    }

    /// Revokes every SecretID registered for `role`. Returns how many were removed.
    ///
    /// The role's entries are enumerated once; SecretIDs registered after the
    /// enumeration survive. Accessor entries are left behind: they resolve to
    /// entries that no longer exist and are reclaimed by [`tidy`](Self::tidy).
    ///
    /// # Errors
    ///
    /// - [`SecretIdError::InvalidInput`] for an empty or oversized role.
    /// - [`SecretIdError::Storage`] if the enumeration fails.
    /// - [`SecretIdError::FlushIncomplete`] if a deletion fails part way. The
    ///   entries already deleted stay deleted; flushing again resumes.
    #[tracing::instrument(skip(self, ctx), fields(scope = ?scope))]
    pub async fn flush_role(
        &self,
        ctx: &OperationContext,
        scope: SecretIdScope,
        role: &str,
    ) -> Result<usize> {
        let ctx = ctx.or_timeout(self.config.operation_timeout());
        let role_digest = self.role_digest(role)?;

        let _listing = ctx.read(&self.locks.listing).await?;
        let digests = self.list(&ctx, &scope.role_prefix(&role_digest)).await?;

        let mut deleted = 0;
        for secret_id_digest in digests.iter().filter(|d| !d.ends_with('/')) {
            let key = scope.entry_key(&role_digest, secret_id_digest);
            let result = async {
                let _write = ctx.write(self.locks.secret_id.lock_for(secret_id_digest)).await?;
                self.remove(&ctx, &key).await
            }
            .await;

            if let Err(err) = result {
                warn!(deleted, error = %err, "flush stopped part way");
                self.metrics.record_flushed(deleted as u64);
                return Err(SecretIdError::FlushIncomplete { deleted, source: Box::new(err) });
            }
            deleted += 1;
        }

        self.metrics.record_flushed(deleted as u64);
        info!(deleted, "flushed role SecretIDs");
        Ok(deleted)
    }

    /// Accessors of every SecretID registered for `role`, sorted.
    ///
    /// # Errors
    ///
    /// - [`SecretIdError::InvalidInput`] for an empty or oversized role.
    /// - [`SecretIdError::Storage`], [`SecretIdError::Cancelled`],
    ///   [`SecretIdError::DeadlineExceeded`].
    #[tracing::instrument(skip(self, ctx), fields(scope = ?scope))]
    pub async fn list_accessors(
        &self,
        ctx: &OperationContext,
        scope: SecretIdScope,
        role: &str,
    ) -> Result<Vec<String>> {
        let ctx = ctx.or_timeout(self.config.operation_timeout());
        let role_digest = self.role_digest(role)?;

        let _listing = ctx.read(&self.locks.listing).await?;
        let digests = self.list(&ctx, &scope.role_prefix(&role_digest)).await?;

        let mut accessors = Vec::with_capacity(digests.len());
        for secret_id_digest in digests.iter().filter(|d| !d.ends_with('/')) {
            let key = scope.entry_key(&role_digest, secret_id_digest);
            let _read = ctx.read(self.locks.secret_id.lock_for(secret_id_digest)).await?;
            if let Some(entry) = self.load(&ctx, &key).await?.filter(|e| !e.accessor.is_empty()) {
                accessors.push(entry.accessor);
            }
        }
        accessors.sort_unstable();
        Ok(accessors)
    }

    /// Removes expired SecretIDs and accessors left behind by flushes.
    ///
    /// Runs with the listing lock held exclusively, so it never overlaps a
    /// flush or listing. Accessor reclamation additionally holds every
    /// SecretID slot, which keeps out registrations and revocations that are
    /// between their accessor write and their entry write. Stops at the first
    /// failure; a later pass picks up where this one stopped.
    ///
    /// # Errors
    ///
    /// [`SecretIdError::Storage`], [`SecretIdError::Cancelled`],
    /// [`SecretIdError::DeadlineExceeded`].
    #[tracing::instrument(skip(self, ctx), fields(scope = ?scope))]
    pub async fn tidy(&self, ctx: &OperationContext, scope: SecretIdScope) -> Result<TidyStats> {
        let ctx = ctx.or_timeout(self.config.operation_timeout());
        let _listing = ctx.write(&self.locks.listing).await?;
        let mut stats = TidyStats::default();
        let now = Utc::now();

        for (role_digest, secret_id_digest) in self.enumerate(&ctx, scope).await? {
            let key = scope.entry_key(&role_digest, &secret_id_digest);
            let _write = ctx.write(self.locks.secret_id.lock_for(&secret_id_digest)).await?;
            let Some(entry) = self.load(&ctx, &key).await? else {
                continue;
            };
            if !entry.is_expired_at(now) {
                stats.retained += 1;
                continue;
            }

            self.remove(&ctx, &key).await?;
            self.observe(self.accessors.delete(&ctx, scope, &entry.accessor).await)?;
            stats.expired_removed += 1;
            self.metrics.record_tidied(1);
        }

        let mut slots = Vec::with_capacity(self.locks.secret_id.len());
        for lock in self.locks.secret_id.slots() {
            slots.push(ctx.write(lock).await?);
        }

        // Keyed by accessor, not by SecretID digest: a digest shared by two
        // roles must not keep a flushed role's accessor alive.
        let mut live = HashSet::new();
        for (role_digest, secret_id_digest) in self.enumerate(&ctx, scope).await? {
            let key = scope.entry_key(&role_digest, &secret_id_digest);
            if let Some(entry) = self.load(&ctx, &key).await?.filter(|e| !e.accessor.is_empty()) {
                live.insert(self.accessors.storage_key(scope, &entry.accessor)?);
            }
        }
        let accessor_prefix = scope.accessor_prefix();
        for name in self.list(&ctx, accessor_prefix).await? {
            if name.ends_with('/') {
                continue;
            }
            let key = format!("{accessor_prefix}{name}");
            if live.contains(&key) {
                continue;
            }

            self.remove(&ctx, &key).await?;
            stats.orphaned_accessors_removed += 1;
            self.metrics.record_tidied(1);
        }
        drop(slots);

        info!(
            expired = stats.expired_removed,
            orphans = stats.orphaned_accessors_removed,
            retained = stats.retained,
            "tidied SecretIDs"
        );
        Ok(stats)
    }

    async fn read_locked(
        &self,
        ctx: &OperationContext,
        scope: SecretIdScope,
        role_digest: &str,
        secret_id_digest: &str,
        accessor: Option<&str>,
    ) -> Result<Option<SecretIdEntry>> {
        let key = scope.entry_key(role_digest, secret_id_digest);
        let lock = self.locks.secret_id.lock_for(secret_id_digest);

        let mut entry = {
            let _read = ctx.read(lock).await?;
            match self.load_owned(ctx, &key, accessor).await? {
                Some(entry) => entry,
                None => return Ok(None),
            }
        };
        if !entry.reconcile_deprecated_num_uses() {
            return Ok(Some(entry));
        }

        // Upgrade under the write lock, starting again from what is stored now.
        let _write = ctx.write(lock).await?;
        let Some(mut entry) = self.load_owned(ctx, &key, accessor).await? else {
            return Ok(None);
        };
        if entry.reconcile_deprecated_num_uses() {
            self.store(ctx, key, &entry).await?;
            self.metrics.record_upgrade();
            debug!("reconciled deprecated use count");
        }
        Ok(Some(entry))
    }

    async fn destroy_locked(
        &self,
        ctx: &OperationContext,
        scope: SecretIdScope,
        role_digest: &str,
        secret_id_digest: &str,
        accessor: Option<&str>,
    ) -> Result<bool> {
        let key = scope.entry_key(role_digest, secret_id_digest);
        let _write = ctx.write(self.locks.secret_id.lock_for(secret_id_digest)).await?;
        let Some(entry) = self.load_owned(ctx, &key, accessor).await? else {
            return Ok(false);
        };

        self.remove(ctx, &key).await?;
        self.observe(self.accessors.delete(ctx, scope, &entry.accessor).await)?;

        self.metrics.record_revocation();
        debug!(accessor = %entry.accessor, "destroyed SecretID");
        Ok(true)
    }

    /// Every `(role digest, SecretID digest)` pair stored in `scope`.
    async fn enumerate(
        &self,
        ctx: &OperationContext,
        scope: SecretIdScope,
    ) -> Result<Vec<(String, String)>> {
        let mut pairs = Vec::new();
        for role in self.list(ctx, scope.secret_id_prefix()).await? {
            let Some(role_digest) = role.strip_suffix('/') else {
                continue;
            };
            for name in self.list(ctx, &scope.role_prefix(role_digest)).await? {
                if !name.ends_with('/') {
                    pairs.push((role_digest.to_owned(), name));
                }
            }
        }
        Ok(pairs)
    }

    fn duplicate(&self) -> SecretIdError {
        self.metrics.record_duplicate();
        warn!("SecretID is already registered");
        SecretIdError::AlreadyRegistered
    }

    fn storage_failure(
        &self,
        operation: &'static str,
        key: &str,
        err: StorageError,
    ) -> SecretIdError {
        self.metrics.record_storage_error();
        SecretIdError::storage(operation, key, err)
    }

    /// Counts storage failures surfaced by the accessor index.
    fn observe<T>(&self, result: Result<T>) -> Result<T> {
        if matches!(result, Err(SecretIdError::Storage { .. })) {
            self.metrics.record_storage_error();
        }
        result
    }

    async fn exists(&self, ctx: &OperationContext, key: &str) -> Result<bool> {
        ctx.run(self.backend.get(key))
            .await?
            .map(|value| value.is_some())
            .map_err(|e| self.storage_failure("get", key, e))
    }

    async fn load(&self, ctx: &OperationContext, key: &str) -> Result<Option<SecretIdEntry>> {
        ctx.run(self.backend.get_json::<SecretIdEntry>(key))
            .await?
            .map_err(|e| self.storage_failure("get", key, e))
    }

    /// Loads the entry at `key`, treating it as absent when it is not the one
    /// `accessor` was issued for. The same SecretID value may be registered
    /// under several roles, each with its own accessor.
    async fn load_owned(
        &self,
        ctx: &OperationContext,
        key: &str,
        accessor: Option<&str>,
    ) -> Result<Option<SecretIdEntry>> {
        let entry = self.load(ctx, key).await?;
        Ok(match accessor {
            Some(accessor) => entry.filter(|e| e.accessor == accessor),
            None => entry,
        })
    }

    async fn store(
        &self,
        ctx: &OperationContext,
        key: String,
        entry: &SecretIdEntry,
    ) -> Result<()> {
        ctx.run(self.backend.put_json(key.clone(), entry))
            .await?
            .map_err(|e| self.storage_failure("put", &key, e))
    }

    async fn remove(&self, ctx: &OperationContext, key: &str) -> Result<()> {
        ctx.run(self.backend.delete(key))
            .await?
            .map_err(|e| self.storage_failure("delete", key, e))
    }

    async fn list(&self, ctx: &OperationContext, prefix: &str) -> Result<Vec<String>> {
        ctx.run(self.backend.list(prefix))
            .await?
            .map_err(|e| self.storage_failure("list", prefix, e))
    }
}

impl<B> std::fmt::Debug for SecretIdRegistry<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretIdRegistry")
            .field("config", &self.config)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}
