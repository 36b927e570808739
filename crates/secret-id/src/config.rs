//! Configuration for the SecretID registry.
//!
//! [`SecretIdConfig`] sizes the lock stripes and sets the default deadline
//! applied to operations whose context carries none. It deserializes from any
//! serde format; durations use humantime strings (`"5s"`, `"250ms"`).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use warden_storage::ConfigError;

/// Default number of slots in each lock stripe.
pub const DEFAULT_LOCK_COUNT: usize = 256;

fn default_lock_count() -> usize {
    DEFAULT_LOCK_COUNT
}

/// Registry configuration.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use warden_secret_id::SecretIdConfig;
///
/// let config = SecretIdConfig::builder()
///     .secret_id_lock_count(64)
///     .operation_timeout(Duration::from_secs(5))
///     .build()?;
///
/// assert_eq!(config.secret_id_lock_count(), 64);
/// assert_eq!(config.accessor_lock_count(), 256);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSecretIdConfig")]
pub struct SecretIdConfig {
    secret_id_lock_count: usize,
    accessor_lock_count: usize,
    #[serde(with = "humantime_serde")]
    operation_timeout: Option<Duration>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSecretIdConfig {
    #[serde(default = "default_lock_count")]
    secret_id_lock_count: usize,
    #[serde(default = "default_lock_count")]
    accessor_lock_count: usize,
    #[serde(with = "humantime_serde", default)]
    operation_timeout: Option<Duration>,
}

impl TryFrom<RawSecretIdConfig> for SecretIdConfig {
    type Error = ConfigError;

    fn try_from(raw: RawSecretIdConfig) -> Result<Self, Self::Error> {
        Self::builder()
            .secret_id_lock_count(raw.secret_id_lock_count)
            .accessor_lock_count(raw.accessor_lock_count)
            .maybe_operation_timeout(raw.operation_timeout)
            .build()
    }
}

#[bon::bon]
impl SecretIdConfig {
    /// Creates a validated configuration.
    ///
    /// # Optional Fields
    ///
    /// * `secret_id_lock_count` - Slots in the SecretID lock stripe (default: 256).
    /// * `accessor_lock_count` - Slots in the accessor lock stripe (default: 256).
    /// * `operation_timeout` - Deadline applied when the caller's context has none.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BelowMinimum`] if a lock count is zero or the
    /// timeout is zero.
    #[builder]
    pub fn new(
        #[builder(default = DEFAULT_LOCK_COUNT)] secret_id_lock_count: usize,
        #[builder(default = DEFAULT_LOCK_COUNT)] accessor_lock_count: usize,
        operation_timeout: Option<Duration>,
    ) -> Result<Self, ConfigError> {
        let counts = [
            ("secret_id_lock_count", secret_id_lock_count),
            ("accessor_lock_count", accessor_lock_count),
        ];
        for (field, count) in counts {
            if count == 0 {
                return Err(ConfigError::BelowMinimum {
                    field,
                    min: "1".into(),
                    value: "0".into(),
                });
            }
        }
        if operation_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::BelowMinimum {
                field: "operation_timeout",
                min: "1ns".into(),
                value: "0s".into(),
            });
        }

        Ok(Self { secret_id_lock_count, accessor_lock_count, operation_timeout })
    }

    /// Returns the number of slots in the SecretID lock stripe.
    #[must_use]
    pub fn secret_id_lock_count(&self) -> usize {
        self.secret_id_lock_count
    }

    /// Returns the number of slots in the accessor lock stripe.
    #[must_use]
    pub fn accessor_lock_count(&self) -> usize {
        self.accessor_lock_count
    }

    /// Returns the default operation deadline, if any.
    #[must_use]
    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout
    }
}

impl Default for SecretIdConfig {
    fn default() -> Self {
        Self {
            secret_id_lock_count: DEFAULT_LOCK_COUNT,
            accessor_lock_count: DEFAULT_LOCK_COUNT,
            operation_timeout: None,
        }
    }
}
