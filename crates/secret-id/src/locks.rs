//! Striped reader/writer locks.
//!
//! The storage backend has no transactions, so the registry linearizes
//! operations on a credential by locking a slot chosen from the credential's
//! digest. A [`LockStripe`] is a fixed pool of slots; distinct keys may share
//! a slot (false contention), the same key always maps to the same one.
//!
//! The locks are [`tokio::sync::RwLock`]s because guards are held across
//! storage calls.

use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use warden_storage::ConfigError;

use crate::config::{DEFAULT_LOCK_COUNT, SecretIdConfig};

/// A fixed-size pool of reader/writer locks addressed by string key.
#[derive(Debug)]
pub struct LockStripe {
    slots: Box<[RwLock<()>]>,
}

impl LockStripe {
    /// Creates a stripe with `count` slots.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BelowMinimum`] if `count` is zero.
    pub fn new(count: usize) -> Result<Self, ConfigError> {
        if count == 0 {
            return Err(ConfigError::BelowMinimum {
                field: "lock_count",
                min: "1".into(),
                value: "0".into(),
            });
        }
        Ok(Self::with_slots(count))
    }

    fn with_slots(count: usize) -> Self {
        Self { slots: (0..count.max(1)).map(|_| RwLock::new(())).collect() }
    }

    /// Returns the number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Always `false`; a stripe has at least one slot.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns the slot index `key` maps to.
    ///
    /// The first eight bytes of SHA-256(key), big-endian, modulo the slot count.
    #[must_use]
    pub fn slot_for(&self, key: &str) -> usize {
        let hash = Sha256::digest(key.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&hash[..8]);
        let slots = self.slots.len() as u64;
        (u64::from_be_bytes(prefix) % slots) as usize
    }

    /// Returns the lock guarding `key`.
    #[must_use]
    pub fn lock_for(&self, key: &str) -> &RwLock<()> {
        &self.slots[self.slot_for(key)]
    }

    /// Every slot, in index order.
    pub(crate) fn slots(&self) -> impl Iterator<Item = &RwLock<()>> {
        self.slots.iter()
    }
}

/// The complete set of locks one registry uses.
///
/// Lock order is fixed: `listing` first, then at most one `secret_id` slot,
/// then at most one `accessor` slot. The one exception is tidy, which holds
/// `listing` exclusively and then takes every `secret_id` slot in index order.
#[derive(Debug)]
pub struct SecretIdLocks {
    /// Guards individual credential entries, keyed by credential digest.
    pub secret_id: LockStripe,
    /// Guards accessor entries, keyed by accessor.
    pub accessor: LockStripe,
    /// Guards enumeration: read for flush and listing, write for tidy.
    pub listing: RwLock<()>,
}

impl SecretIdLocks {
    /// Creates locks sized from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BelowMinimum`] if a configured count is zero.
    pub fn new(config: &SecretIdConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            secret_id: LockStripe::new(config.secret_id_lock_count())?,
            accessor: LockStripe::new(config.accessor_lock_count())?,
            listing: RwLock::new(()),
        })
    }
}

impl Default for SecretIdLocks {
    fn default() -> Self {
        Self {
            secret_id: LockStripe::with_slots(DEFAULT_LOCK_COUNT),
            accessor: LockStripe::with_slots(DEFAULT_LOCK_COUNT),
            listing: RwLock::new(()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::time::Duration;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn zero_slots_rejected() {
        assert!(LockStripe::new(0).is_err());
    }

    #[test]
    fn same_key_same_slot() {
        let stripe = LockStripe::new(256).unwrap();
        assert_eq!(stripe.slot_for("abc"), stripe.slot_for("abc"));
        assert!(std::ptr::eq(stripe.lock_for("abc"), stripe.lock_for("abc")));
    }

    #[test]
    fn single_slot_stripe_maps_everything_to_zero() {
        let stripe = LockStripe::new(1).unwrap();
        for key in ["", "a", "secret_id/x/y"] {
            assert_eq!(stripe.slot_for(key), 0);
        }
    }

    #[test]
    fn keys_spread_across_slots() {
        let stripe = LockStripe::new(16).unwrap();
        let used: std::collections::HashSet<usize> =
            (0..256).map(|i| stripe.slot_for(&format!("key-{i}"))).collect();
        assert!(used.len() > 8, "256 keys landed in only {} of 16 slots", used.len());
    }

    #[test]
    fn default_locks_use_default_count() {
        let locks = SecretIdLocks::default();
        assert_eq!(locks.secret_id.len(), DEFAULT_LOCK_COUNT);
        assert_eq!(locks.accessor.len(), DEFAULT_LOCK_COUNT);
    }

    #[test]
    fn locks_follow_config() {
        let config = SecretIdConfig::builder()
            .secret_id_lock_count(4)
            .accessor_lock_count(2)
            .build()
            .unwrap();
        let locks = SecretIdLocks::new(&config).unwrap();
        assert_eq!(locks.secret_id.len(), 4);
        assert_eq!(locks.accessor.len(), 2);
    }

    #[tokio::test]
    async fn writer_excludes_readers_on_same_slot() {
        let stripe = LockStripe::new(8).unwrap();
        let lock = stripe.lock_for("k");

        let write = lock.write().await;
        let blocked = tokio::time::timeout(Duration::from_millis(20), lock.read()).await;
        assert!(blocked.is_err(), "read should wait for the writer");
        drop(write);

        let _r1 = lock.read().await;
        let _r2 = tokio::time::timeout(Duration::from_millis(20), lock.read())
            .await
            .expect("readers share the slot");
    }

    proptest! {
        #[test]
        fn slot_is_always_in_range(count in 1usize..1024, key in ".{0,64}") {
            let stripe = LockStripe::new(count).unwrap();
            prop_assert!(stripe.slot_for(&key) < count);
        }
    }
}
