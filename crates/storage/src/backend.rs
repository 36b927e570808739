//! The key-value contract the credential engine is written against.
//!
//! Keys are `/`-separated paths and values are opaque bytes. A backend offers
//! single-key reads and writes plus a one-level [`list`](StorageBackend::list);
//! it has no transactions and no compare-and-swap, so every multi-key
//! invariant is kept by the caller's locking. SecretID entries and accessor
//! indexes are built on top of this trait, never inside a backend.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::{StorageError, StorageResult};

/// A hierarchical byte store shared by every credential operation.
///
/// Implementations must give a single caller read-your-writes consistency.
/// Nothing is promised about atomicity across keys.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use warden_storage::{MemoryBackend, StorageBackend};
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let store = MemoryBackend::new();
///
/// store.put("secret_id/role/sid".to_owned(), b"{}".to_vec()).await.unwrap();
/// assert_eq!(store.get("secret_id/role/sid").await.unwrap(), Some(Bytes::from_static(b"{}")));
/// assert_eq!(store.list("secret_id/").await.unwrap(), vec!["role/".to_owned()]);
/// # });
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// The value stored at `key`, or `None` when nothing is there.
    #[must_use = "a failed read must not be mistaken for an absent key"]
    async fn get(&self, key: &str) -> StorageResult<Option<Bytes>>;

    /// Writes `value` at `key`, replacing what was there.
    #[must_use = "an unchecked write may silently lose a credential"]
    async fn put(&self, key: String, value: Vec<u8>) -> StorageResult<()>;

    /// Removes `key`. Removing an absent key succeeds.
    #[must_use = "an unchecked delete may leave a credential behind"]
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Lists the direct children of `prefix`.
    ///
    /// Returned names are relative to `prefix`. A child that has further
    /// descendants is returned once, with a trailing `/`. Results are sorted.
    /// Listing is not atomic with concurrent writes: keys written while the
    /// listing runs may or may not be included.
    #[must_use = "a failed listing must not be mistaken for an empty one"]
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Checks that the backend can serve requests.
    #[must_use = "the health check result must be inspected"]
    async fn health_check(&self) -> StorageResult<()>;

    /// [`get`](StorageBackend::get) followed by JSON decoding.
    ///
    /// # Errors
    ///
    /// - [`StorageError::Serialization`] if the stored bytes are not valid JSON for `T`.
    async fn get_json<T>(&self, key: &str) -> StorageResult<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        let Some(bytes) = self.get(key).await? else {
            return Ok(None);
        };

        serde_json::from_slice(&bytes).map(Some).map_err(|e| {
            StorageError::serialization_with_source(format!("failed to decode entry at {key}"), e)
        })
    }

    /// JSON encoding followed by [`put`](StorageBackend::put).
    ///
    /// # Errors
    ///
    /// - [`StorageError::Serialization`] if `value` cannot be encoded.
    async fn put_json<T>(&self, key: String, value: &T) -> StorageResult<()>
    where
        T: Serialize + Sync,
    {
        let bytes = serde_json::to_vec(value).map_err(|e| {
            StorageError::serialization_with_source(format!("failed to encode entry at {key}"), e)
        })?;

        self.put(key, bytes).await
    }
}
