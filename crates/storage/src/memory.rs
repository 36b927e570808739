//! Process-local [`StorageBackend`] for tests, benchmarks and single-node use.
//!
//! [`MemoryBackend`] keeps every key in one ordered map behind a
//! [`parking_lot::RwLock`]. Ordering makes [`list`](StorageBackend::list) a
//! range scan over the prefix, and writes are checked against [`SizeLimits`]
//! just as a remote store would check them. Nothing survives the process.
//!
//! ```
//! use warden_storage::{MemoryBackend, StorageBackend};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let backend = MemoryBackend::new();
//! backend.put("accessor/abc".to_owned(), b"{}".to_vec()).await.unwrap();
//!
//! assert_eq!(backend.list("accessor/").await.unwrap(), vec!["abc".to_owned()]);
//! assert_eq!(backend.keys_with_prefix("accessor/").len(), 1);
//! # });
//! ```

use std::{collections::BTreeMap, ops::Bound, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;
use fail::fail_point;
use parking_lot::RwLock;

use crate::{
    backend::StorageBackend,
    error::{StorageError, StorageResult},
    size_limits::{SizeLimits, validate_key_size, validate_sizes},
};

/// Ordered in-memory key space. Clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemoryBackend {
    data: Arc<RwLock<BTreeMap<String, Bytes>>>,
    limits: SizeLimits,
}

impl MemoryBackend {
    /// An empty backend with [`SizeLimits::default`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty backend that rejects writes outside `limits`.
    #[must_use]
    pub fn with_size_limits(limits: SizeLimits) -> Self {
        Self { data: Arc::default(), limits }
    }

    /// Number of stored keys, at every depth.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// `true` when no key is stored at any depth.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Returns every stored key starting with `prefix`, at any depth.
    ///
    /// Intended for tests and diagnostics; production code goes through
    /// [`list`](StorageBackend::list).
    #[must_use]
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let data = self.data.read();
        data.range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .map(|(k, _)| k)
            .take_while(|k| k.starts_with(prefix))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    #[tracing::instrument(skip(self))]
    async fn get(&self, key: &str) -> StorageResult<Option<Bytes>> {
        fail_point!("memory-get", |_| {
            Err(StorageError::connection("injected get failure"))
        });

        validate_key_size(key.as_bytes(), &self.limits)?;
        Ok(self.data.read().get(key).cloned())
    }

    #[tracing::instrument(skip(self, value), fields(value_len = value.len()))]
    async fn put(&self, key: String, value: Vec<u8>) -> StorageResult<()> {
        fail_point!("memory-put", |_| {
            Err(StorageError::connection("injected put failure"))
        });

        validate_sizes(key.as_bytes(), &value, &self.limits)?;
        self.data.write().insert(key, Bytes::from(value));
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, key: &str) -> StorageResult<()> {
        fail_point!("memory-delete", |_| {
            Err(StorageError::connection("injected delete failure"))
        });

        self.data.write().remove(key);
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        fail_point!("memory-list", |_| {
            Err(StorageError::connection("injected list failure"))
        });

        let data = self.data.read();
        let mut children: Vec<String> = Vec::new();

        // Keys sharing a prefix are contiguous in a BTreeMap, so the scan can
        // stop at the first key outside it and duplicates are always adjacent.
        for key in data.range::<str, _>((Bound::Included(prefix), Bound::Unbounded)).map(|(k, _)| k)
        {
            let Some(rest) = key.strip_prefix(prefix) else {
                break;
            };
            if rest.is_empty() {
                continue;
            }

            let child = match rest.find('/') {
                Some(idx) => &rest[..=idx],
                None => rest,
            };
            if children.last().map(String::as_str) != Some(child) {
                children.push(child.to_owned());
            }
        }

        Ok(children)
    }

    #[tracing::instrument(skip(self))]
    async fn health_check(&self) -> StorageResult<()> {
        fail_point!("memory-health-check", |_| {
            Err(StorageError::internal("injected health check failure"))
        });

        // A wedged writer would block here.
        drop(self.data.read());
        Ok(())
    }
}
