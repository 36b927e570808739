//! Keyed digest service.
//!
//! SecretIDs are never stored in recoverable form. Storage keys are built from
//! HMAC-SHA256 digests of the role name and of the credential value, and
//! accessor entries are stored under a digest of the accessor. The key is a
//! per-mount secret supplied by the caller and never persisted by this crate.

use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::DigestError;

type HmacSha256 = Hmac<Sha256>;

/// Maximum number of bytes accepted by [`KeyedDigest::digest`].
pub const MAX_DIGEST_INPUT_LEN: usize = 4096;

/// Computes the hex-encoded HMAC-SHA256 of `value` under `key`.
///
/// # Errors
///
/// - [`DigestError::InvalidKey`] if `key` is empty.
/// - [`DigestError::InputTooLarge`] if `value` exceeds [`MAX_DIGEST_INPUT_LEN`] bytes.
pub fn digest(key: &[u8], value: impl AsRef<[u8]>) -> Result<String, DigestError> {
    if key.is_empty() {
        return Err(DigestError::InvalidKey);
    }
    let value = value.as_ref();
    if value.len() > MAX_DIGEST_INPUT_LEN {
        return Err(DigestError::InputTooLarge { len: value.len(), limit: MAX_DIGEST_INPUT_LEN });
    }

    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| DigestError::InvalidKey)?;
    mac.update(value);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// A validated digest key.
///
/// The key bytes are zeroed on drop and never printed.
///
/// # Example
///
/// ```
/// use warden_secret_id::KeyedDigest;
///
/// let digest = KeyedDigest::new(b"mount-salt".to_vec()).unwrap();
/// let a = digest.digest("role-a").unwrap();
/// assert_eq!(a, digest.digest("role-a").unwrap());
/// assert_ne!(a, digest.digest("role-b").unwrap());
/// ```
#[derive(Clone)]
pub struct KeyedDigest {
    key: Zeroizing<Vec<u8>>,
}

impl KeyedDigest {
    /// Creates a digest service keyed with `key`.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError::InvalidKey`] if `key` is empty.
    pub fn new(key: impl Into<Vec<u8>>) -> Result<Self, DigestError> {
        let key = Zeroizing::new(key.into());
        if key.is_empty() {
            return Err(DigestError::InvalidKey);
        }
        Ok(Self { key })
    }

    /// Digests `value` under this key.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError::InputTooLarge`] if `value` exceeds
    /// [`MAX_DIGEST_INPUT_LEN`] bytes.
    pub fn digest(&self, value: impl AsRef<[u8]>) -> Result<String, DigestError> {
        digest(&self.key, value)
    }
}

impl fmt::Debug for KeyedDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedDigest").field("key", &"[REDACTED]").finish()
    }
}
