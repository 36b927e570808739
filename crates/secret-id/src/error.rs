//! SecretID engine error types.
//!
//! Absence is never an error here: lookups return `Ok(None)` and revocations
//! of unknown credentials return `Ok(false)`.

use thiserror::Error;
use warden_storage::{ConfigError, StorageError};

/// Result type alias for SecretID engine operations.
pub type Result<T> = std::result::Result<T, SecretIdError>;

/// Errors from the keyed digest service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum DigestError {
    /// The digest key is empty.
    #[error("digest key must not be empty")]
    InvalidKey,

    /// The value to digest is longer than the accepted maximum.
    #[error("digest input is {len} bytes, limit is {limit} bytes")]
    InputTooLarge {
        /// Length of the rejected input.
        len: usize,
        /// Maximum accepted length.
        limit: usize,
    },
}

/// Errors returned by the SecretID registry and its components.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]`. Downstream match expressions must
/// include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SecretIdError {
    /// The caller supplied an empty, oversized or otherwise unusable value.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A credential with the same value is already registered for the role.
    #[error("SecretID is already registered")]
    AlreadyRegistered,

    /// The storage backend failed.
    ///
    /// Wraps the backend error verbatim and records which operation failed on
    /// which storage key. Keys are digests, so they are safe to log.
    #[error("Storage {operation} failed for {key}: {source}")]
    Storage {
        /// Storage operation that failed (`get`, `put`, `delete`, `list`).
        operation: &'static str,
        /// Storage key involved.
        key: String,
        /// The backend error.
        #[source]
        source: StorageError,
    },

    /// The entry's source CIDRs are not contained in the role's bound CIDRs.
    #[error("CIDRs {entry_cidrs:?} are not a subset of the role's bound CIDRs {role_cidrs:?}")]
    CidrNotSubset {
        /// CIDR blocks requested for the credential.
        entry_cidrs: Vec<String>,
        /// CIDR blocks bound on the role.
        role_cidrs: Vec<String>,
    },

    /// A CIDR string could not be parsed as a block or an address.
    #[error("Invalid CIDR block: {0:?}")]
    InvalidCidr(String),

    /// The operation's cancellation token fired.
    #[error("Operation cancelled")]
    Cancelled,

    /// The operation's deadline passed.
    #[error("Operation deadline exceeded")]
    DeadlineExceeded,

    /// A bulk flush stopped part way through.
    ///
    /// Entries deleted before the failure stay deleted. Running the flush
    /// again resumes with whatever remains.
    #[error("Flush stopped after deleting {deleted} entries: {source}")]
    FlushIncomplete {
        /// Entries deleted before the failure.
        deleted: usize,
        /// The failure that stopped the flush.
        #[source]
        source: Box<SecretIdError>,
    },

    /// Invalid engine configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SecretIdError {
    /// Wraps a backend error with the operation and key it happened on.
    #[must_use]
    pub fn storage(operation: &'static str, key: impl Into<String>, source: StorageError) -> Self {
        Self::Storage { operation, key: key.into(), source }
    }

    /// Returns `true` if retrying the same operation could succeed.
    ///
    /// Delegates to [`StorageError::is_transient`] for backend failures; an
    /// incomplete flush is transient when its cause is.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Storage { source, .. } => source.is_transient(),
            Self::FlushIncomplete { source, .. } => source.is_transient(),
            Self::DeadlineExceeded => true,
            _ => false,
        }
    }
}

impl From<DigestError> for SecretIdError {
    fn from(err: DigestError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}
