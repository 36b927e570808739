//! Upper bounds on what a single write may put into a backend.
//!
//! Storage keys in this workspace are built from hex digests and a handful of
//! fixed prefixes, so they are short; values are JSON-encoded credential
//! entries whose size is dominated by caller-supplied metadata and CIDR lists.
//! [`SizeLimits`] bounds both so a single oversized registration cannot reach
//! the backing store.
//!
//! The defaults are [`DEFAULT_MAX_KEY_SIZE`] and [`DEFAULT_MAX_VALUE_SIZE`].

use serde::Deserialize;

use crate::{ConfigError, StorageError};

/// Longest key accepted by default. A digest-derived key is well under this.
pub const DEFAULT_MAX_KEY_SIZE: usize = 512;

/// Largest encoded entry accepted by default.
pub const DEFAULT_MAX_VALUE_SIZE: usize = 512 * 1024;

/// Upper bounds on key and value sizes, enforced on every write.
///
/// Both limits must be at least 1. Deserializing goes through
/// [`SizeLimits::new`], so a config file cannot smuggle in a zero limit.
///
/// # Example
///
/// ```
/// use warden_storage::SizeLimits;
///
/// let limits = SizeLimits::new(256, 64 * 1024).unwrap();
/// assert_eq!(limits.max_key_size(), 256);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawSizeLimits")]
pub struct SizeLimits {
    max_key_size: usize,
    max_value_size: usize,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSizeLimits {
    #[serde(default = "default_max_key_size")]
    max_key_size: usize,
    #[serde(default = "default_max_value_size")]
    max_value_size: usize,
}

fn default_max_key_size() -> usize {
    DEFAULT_MAX_KEY_SIZE
}

fn default_max_value_size() -> usize {
    DEFAULT_MAX_VALUE_SIZE
}

impl TryFrom<RawSizeLimits> for SizeLimits {
    type Error = ConfigError;

    fn try_from(raw: RawSizeLimits) -> Result<Self, Self::Error> {
        Self::new(raw.max_key_size, raw.max_value_size)
    }
}

impl SizeLimits {
    /// Builds limits from explicit byte counts.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BelowMinimum`] if either limit is zero.
    pub fn new(max_key_size: usize, max_value_size: usize) -> Result<Self, ConfigError> {
        for (field, value) in [("max_key_size", max_key_size), ("max_value_size", max_value_size)] {
            if value == 0 {
                return Err(ConfigError::BelowMinimum {
                    field,
                    min: "1".into(),
                    value: value.to_string(),
                });
            }
        }
        Ok(Self { max_key_size, max_value_size })
    }

    #[must_use]
    pub fn max_key_size(&self) -> usize {
        self.max_key_size
    }

    #[must_use]
    pub fn max_value_size(&self) -> usize {
        self.max_value_size
    }

    const fn from_defaults() -> Self {
        Self { max_key_size: DEFAULT_MAX_KEY_SIZE, max_value_size: DEFAULT_MAX_VALUE_SIZE }
    }
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self::from_defaults()
    }
}

/// Checks a write against `limits`.
///
/// # Errors
///
/// Returns [`StorageError::SizeLimitExceeded`] naming the first limit that
/// was violated. The key is checked before the value.
pub fn validate_sizes(key: &[u8], value: &[u8], limits: &SizeLimits) -> Result<(), StorageError> {
    validate_key_size(key, limits)?;
    check("value", value.len(), limits.max_value_size)
}

/// Checks only the key, for reads, deletes and listings.
///
/// # Errors
///
/// Returns [`StorageError::SizeLimitExceeded`] if the key is too long.
pub fn validate_key_size(key: &[u8], limits: &SizeLimits) -> Result<(), StorageError> {
    check("key", key.len(), limits.max_key_size)
}

fn check(kind: &'static str, actual: usize, limit: usize) -> Result<(), StorageError> {
    if actual > limit {
        Err(StorageError::size_limit_exceeded(kind, actual, limit))
    } else {
        Ok(())
    }
}
