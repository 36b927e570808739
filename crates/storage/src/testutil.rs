//! Failure injection for tests of code built on [`StorageBackend`].
//!
//! [`FailingBackend`] wraps a [`MemoryBackend`] and fails writes on command,
//! which is how multi-step credential operations are interrupted half way.
//! Only compiled with the `testutil` feature.
//!
//! ```toml
//! [dev-dependencies]
//! warden-storage = { path = "../storage", features = ["testutil"] }
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use crate::{
    StorageBackend,
    error::{StorageError, StorageResult},
    memory::MemoryBackend,
};

#[derive(Debug, Default)]
struct FailurePlan {
    puts_allowed: Option<usize>,
    deletes_allowed: Option<usize>,
    put_prefix: Option<String>,
}

/// A [`MemoryBackend`] wrapper that fails writes on command.
///
/// After [`fail_deletes_after(n)`](FailingBackend::fail_deletes_after), the
/// next `n` deletes succeed and every later one returns
/// [`StorageError::Connection`]. Puts work the same way, and can also be
/// failed by key prefix. Reads and listing always pass through.
///
/// Clones share the plan, the counters and the underlying data.
#[derive(Clone, Debug, Default)]
pub struct FailingBackend {
    inner: MemoryBackend,
    plan: Arc<Mutex<FailurePlan>>,
    puts: Arc<AtomicUsize>,
    deletes: Arc<AtomicUsize>,
}

impl FailingBackend {
    /// Wraps `inner` with no failures planned.
    #[must_use]
    pub fn new(inner: MemoryBackend) -> Self {
        Self { inner, ..Self::default() }
    }

    /// Returns the wrapped backend, which bypasses injected failures.
    #[must_use]
    pub fn inner(&self) -> &MemoryBackend {
        &self.inner
    }

    /// Lets the next `allowed` puts succeed, then fails every put.
    pub fn fail_puts_after(&self, allowed: usize) {
        self.puts.store(0, Ordering::SeqCst);
        self.plan.lock().puts_allowed = Some(allowed);
    }

    /// Lets the next `allowed` deletes succeed, then fails every delete.
    pub fn fail_deletes_after(&self, allowed: usize) {
        self.deletes.store(0, Ordering::SeqCst);
        self.plan.lock().deletes_allowed = Some(allowed);
    }

    /// Fails every put whose key starts with `prefix`.
    pub fn fail_puts_with_prefix(&self, prefix: impl Into<String>) {
        self.plan.lock().put_prefix = Some(prefix.into());
    }

    /// Clears all planned failures.
    pub fn heal(&self) {
        *self.plan.lock() = FailurePlan::default();
    }

    fn should_fail_put(&self, key: &str) -> bool {
        let plan = self.plan.lock();
        if plan.put_prefix.as_deref().is_some_and(|p| key.starts_with(p)) {
            return true;
        }
        let attempt = self.puts.fetch_add(1, Ordering::SeqCst);
        plan.puts_allowed.is_some_and(|allowed| attempt >= allowed)
    }

    fn should_fail_delete(&self) -> bool {
        let plan = self.plan.lock();
        let attempt = self.deletes.fetch_add(1, Ordering::SeqCst);
        plan.deletes_allowed.is_some_and(|allowed| attempt >= allowed)
    }
}

#[async_trait]
impl StorageBackend for FailingBackend {
    async fn get(&self, key: &str) -> StorageResult<Option<Bytes>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: String, value: Vec<u8>) -> StorageResult<()> {
        if self.should_fail_put(&key) {
            return Err(StorageError::connection(format!("injected put failure at {key}")));
        }
        self.inner.put(key, value).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        if self.should_fail_delete() {
            return Err(StorageError::connection(format!("injected delete failure at {key}")));
        }
        self.inner.delete(key).await
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        self.inner.list(prefix).await
    }

    async fn health_check(&self) -> StorageResult<()> {
        self.inner.health_check().await
    }
}

/// Unwraps a [`StorageResult`], panicking with the error's debug form.
#[macro_export]
macro_rules! assert_storage_ok {
    ($result:expr) => {
        match $result {
            Ok(val) => val,
            Err(e) => panic!("expected Ok, got StorageError: {e:?}"),
        }
    };
    ($result:expr, $msg:expr) => {
        match $result {
            Ok(val) => val,
            Err(e) => panic!("{}: expected Ok, got StorageError: {e:?}", $msg),
        }
    };
}

/// Asserts that a [`StorageResult`] failed with [`StorageError::Connection`].
#[macro_export]
macro_rules! assert_connection_error {
    ($result:expr) => {{
        let result = $result;
        assert!(
            matches!(result, Err($crate::error::StorageError::Connection { .. })),
            "expected StorageError::Connection, got: {result:?}",
        );
    }};
}

/// Returns `true` if the result failed with an error worth retrying.
pub fn is_transient<T>(result: &StorageResult<T>) -> bool {
    result.as_ref().err().is_some_and(StorageError::is_transient)
}
