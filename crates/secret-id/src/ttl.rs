//! SecretID lifetime policy.

use chrono::{DateTime, TimeDelta, Utc};

/// Source of system-wide lease limits.
///
/// Implemented by whatever owns mount and system tuning; the registry only
/// reads the ceiling.
pub trait SystemView: Send + Sync {
    /// The longest lifetime any credential may have.
    fn max_lease_ttl(&self) -> TimeDelta;
}

/// A [`SystemView`] with a fixed ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticSystemView {
    max_lease_ttl: TimeDelta,
}

impl StaticSystemView {
    /// Creates a view reporting `max_lease_ttl`.
    #[must_use]
    pub fn new(max_lease_ttl: TimeDelta) -> Self {
        Self { max_lease_ttl }
    }
}

impl SystemView for StaticSystemView {
    fn max_lease_ttl(&self) -> TimeDelta {
        self.max_lease_ttl
    }
}

/// Bounds a requested lifetime by the system ceiling.
///
/// Negative requests and requests above `system_max` become `system_max`.
/// Zero passes through unchanged and means the credential never expires.
///
/// ```
/// use chrono::TimeDelta;
/// use warden_secret_id::ttl::effective_ttl;
///
/// let max = TimeDelta::seconds(10);
/// assert_eq!(effective_ttl(TimeDelta::seconds(20), max), max);
/// assert_eq!(effective_ttl(TimeDelta::zero(), max), TimeDelta::zero());
/// ```
#[must_use]
pub fn effective_ttl(requested: TimeDelta, system_max: TimeDelta) -> TimeDelta {
    if requested < TimeDelta::zero() || requested > system_max { system_max } else { requested }
}

/// Expiration instant for an entry created at `created_at` with lifetime `ttl`.
///
/// `None` means never. A lifetime too large to represent also never expires.
#[must_use]
pub fn expiration_for(created_at: DateTime<Utc>, ttl: TimeDelta) -> Option<DateTime<Utc>> {
    if ttl.is_zero() {
        return None;
    }
    created_at.checked_add_signed(ttl)
}
