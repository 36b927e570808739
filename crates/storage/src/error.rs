//! Errors surfaced by storage backends.
//!
//! Backends translate whatever their transport or engine reports into one of
//! five [`StorageError`] kinds and keep the original as `source`. Callers use
//! [`StorageError::is_transient`] to decide whether a retry is worthwhile.
//!
//! A missing key is not an error: [`get`](crate::StorageBackend::get) returns
//! `Ok(None)` and [`delete`](crate::StorageBackend::delete) of a missing key is a no-op.
//!
//! ```
//! use warden_storage::{StorageError, StorageResult};
//!
//! fn lookup(key: &str) -> StorageResult<Vec<u8>> {
//!     Err(StorageError::connection(format!("replica unreachable while reading {key}")))
//! }
//!
//! assert!(lookup("accessor/ab12").unwrap_err().is_transient());
//! ```

use std::sync::Arc;

use thiserror::Error;

/// Shared, cloneable error source.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Result of a storage call.
pub type StorageResult<T> = Result<T, StorageError>;

/// A failed storage call.
///
/// Marked `#[non_exhaustive]`; match with a wildcard arm.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// The backend could not be reached or dropped the request.
    #[error("Connection error: {message}")]
    Connection {
        /// What was being attempted.
        message: String,
        /// Transport-level cause, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// A stored value could not be encoded or decoded.
    ///
    /// On reads this usually means the entry was written by an incompatible
    /// release or was corrupted at rest.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Which entry was affected.
        message: String,
        /// Codec error, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// Any other backend failure.
    #[error("Internal error: {message}")]
    Internal {
        /// Backend-specific description.
        message: String,
        /// Underlying cause, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// The backend did not answer in time.
    #[error("Operation timeout")]
    Timeout,

    /// A key or value exceeded the backend's configured [`SizeLimits`](crate::SizeLimits).
    #[error("Size limit exceeded: {kind} is {actual} bytes, limit is {limit} bytes")]
    SizeLimitExceeded {
        /// `"key"` or `"value"`.
        kind: &'static str,
        /// Size that was rejected.
        actual: usize,
        /// Configured limit.
        limit: usize,
    },
}

impl StorageError {
    /// A [`Connection`](Self::Connection) error without a cause.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into(), source: None }
    }

    /// A [`Connection`](Self::Connection) error wrapping `source`.
    #[must_use]
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// A [`Serialization`](Self::Serialization) error wrapping the codec error.
    #[must_use]
    pub fn serialization_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Serialization { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// An [`Internal`](Self::Internal) error without a cause.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into(), source: None }
    }

    /// A [`Timeout`](Self::Timeout) error.
    #[must_use]
    pub fn timeout() -> Self {
        Self::Timeout
    }

    /// A [`SizeLimitExceeded`](Self::SizeLimitExceeded) error.
    #[must_use]
    pub fn size_limit_exceeded(kind: &'static str, actual: usize, limit: usize) -> Self {
        Self::SizeLimitExceeded { kind, actual, limit }
    }

    /// Returns `true` if retrying the same operation could succeed.
    ///
    /// Connection failures and timeouts are transient. Serialization, size
    /// and internal errors are not. Nothing in this workspace retries
    /// automatically; the classification is for callers that do.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout)
    }
}

/// Invalid configuration values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// A numeric field was below its allowed minimum.
    #[error("{field} must be at least {min}, got {value}")]
    BelowMinimum {
        /// The offending field.
        field: &'static str,
        /// Minimum accepted value.
        min: String,
        /// Value that was supplied.
        value: String,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn transient_classification() {
        assert!(StorageError::connection("reset").is_transient());
        assert!(StorageError::timeout().is_transient());
        assert!(!StorageError::internal("boom").is_transient());
        let decode = serde_json::from_str::<u8>("x").unwrap_err();
        assert!(!StorageError::serialization_with_source("bad entry", decode).is_transient());
        assert!(!StorageError::size_limit_exceeded("key", 10, 5).is_transient());
    }

    #[test]
    fn source_chain_is_preserved() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = StorageError::connection_with_source("dial failed", io);
        let source = err.source().expect("source should be set");
        assert_eq!(source.to_string(), "refused");
    }

    #[test]
    fn size_limit_display_names_the_limit() {
        let err = StorageError::size_limit_exceeded("value", 600, 512);
        let display = err.to_string();
        assert!(display.contains("value"), "display: {display}");
        assert!(display.contains("600"), "display: {display}");
        assert!(display.contains("512"), "display: {display}");
    }

    #[test]
    fn config_error_names_field() {
        let err = ConfigError::BelowMinimum {
            field: "max_key_size",
            min: "1".into(),
            value: "0".into(),
        };
        assert_eq!(err.to_string(), "max_key_size must be at least 1, got 0");
    }
}
