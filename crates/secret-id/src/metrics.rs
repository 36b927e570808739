//! Counters for SecretID lifecycle operations.
//!
//! # Examples
//!
//! ```
//! use warden_secret_id::SecretIdMetrics;
//!
//! let metrics = SecretIdMetrics::new();
//! metrics.record_registration();
//! metrics.record_flushed(3);
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.registrations, 1);
//! assert_eq!(snapshot.flushed_entries, 3);
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, bon::Builder)]
pub struct SecretIdMetricsSnapshot {
    /// Successful registrations.
    #[builder(default)]
    pub registrations: u64,
    /// Registrations rejected because the SecretID already existed.
    #[builder(default)]
    pub duplicate_rejections: u64,
    /// Individual SecretIDs revoked by value or accessor.
    #[builder(default)]
    pub revocations: u64,
    /// Entries removed by role flushes.
    #[builder(default)]
    pub flushed_entries: u64,
    /// Entries rewritten to reconcile the deprecated use count.
    #[builder(default)]
    pub upgraded_entries: u64,
    /// Expired entries and orphaned accessors removed by tidy.
    #[builder(default)]
    pub tidied_entries: u64,
    /// Storage failures surfaced to callers.
    #[builder(default)]
    pub storage_errors: u64,
}

impl SecretIdMetricsSnapshot {
    /// Entries removed by any path.
    #[must_use]
    pub fn total_removed(&self) -> u64 {
        self.revocations + self.flushed_entries + self.tidied_entries
    }
}

#[derive(Default)]
struct SecretIdMetricsInner {
    registrations: AtomicU64,
    duplicate_rejections: AtomicU64,
    revocations: AtomicU64,
    flushed_entries: AtomicU64,
    upgraded_entries: AtomicU64,
    tidied_entries: AtomicU64,
    storage_errors: AtomicU64,
}

/// Thread-safe counters shared by clones.
#[derive(Clone, Default)]
pub struct SecretIdMetrics {
    inner: Arc<SecretIdMetricsInner>,
}

impl SecretIdMetrics {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful registration.
    pub fn record_registration(&self) {
        self.inner.registrations.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a rejected duplicate registration.
    pub fn record_duplicate(&self) {
        self.inner.duplicate_rejections.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a single revocation.
    pub fn record_revocation(&self) {
        self.inner.revocations.fetch_add(1, Ordering::Relaxed);
    }

    /// Records `count` entries removed by a flush.
    pub fn record_flushed(&self, count: u64) {
        self.inner.flushed_entries.fetch_add(count, Ordering::Relaxed);
    }

    /// Records an entry rewritten by the deprecated-field upgrade.
    pub fn record_upgrade(&self) {
        self.inner.upgraded_entries.fetch_add(1, Ordering::Relaxed);
    }

    /// Records `count` entries removed by tidy.
    pub fn record_tidied(&self, count: u64) {
        self.inner.tidied_entries.fetch_add(count, Ordering::Relaxed);
    }

    /// Records a storage failure.
    pub fn record_storage_error(&self) {
        self.inner.storage_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the current counter values.
    #[must_use]
    pub fn snapshot(&self) -> SecretIdMetricsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        SecretIdMetricsSnapshot::builder()
            .registrations(load(&self.inner.registrations))
            .duplicate_rejections(load(&self.inner.duplicate_rejections))
            .revocations(load(&self.inner.revocations))
            .flushed_entries(load(&self.inner.flushed_entries))
            .upgraded_entries(load(&self.inner.upgraded_entries))
            .tidied_entries(load(&self.inner.tidied_entries))
            .storage_errors(load(&self.inner.storage_errors))
            .build()
    }
}

impl std::fmt::Debug for SecretIdMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretIdMetrics").field("snapshot", &self.snapshot()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_counters() {
        let metrics = SecretIdMetrics::new();
        let clone = metrics.clone();
        clone.record_registration();
        clone.record_duplicate();
        metrics.record_revocation();
        metrics.record_tidied(2);

        let snap = metrics.snapshot();
        assert_eq!(snap.registrations, 1);
        assert_eq!(snap.duplicate_rejections, 1);
        assert_eq!(snap.total_removed(), 3);
    }

    #[test]
    fn snapshot_builder_defaults_to_zero() {
        let snap = SecretIdMetricsSnapshot::builder().storage_errors(4).build();
        assert_eq!(snap, SecretIdMetricsSnapshot { storage_errors: 4, ..Default::default() });
    }
}
