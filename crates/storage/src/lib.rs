//! Key-value storage for Warden credential engines.
//!
//! Engines persist their entries through [`StorageBackend`]: point reads and
//! writes plus one-level listing, with no transactions and no
//! compare-and-swap. Whatever atomicity an engine needs comes from its own
//! locking.
//!
//! ```text
//! warden-secret-id   registry, accessor index, tidy
//!        |
//! StorageBackend     get / put / delete / list / health_check
//!        |
//! MemoryBackend      in-process, used by tests and benchmarks
//! ```
//!
//! # Quick Start
//!
//! ```
//! use warden_storage::{MemoryBackend, StorageBackend};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = MemoryBackend::new();
//!
//!     backend.put("roles/web/alpha".to_owned(), b"one".to_vec()).await?;
//!     backend.put("roles/db".to_owned(), b"two".to_vec()).await?;
//!
//!     let children = backend.list("roles/").await?;
//!     assert_eq!(children, vec!["db".to_owned(), "web/".to_owned()]);
//!
//!     backend.delete("roles/db").await?;
//!     assert!(backend.get("roles/db").await?.is_none());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! All operations return [`StorageResult<T>`]. A missing key is never an
//! error. Backends map their internal failures onto [`StorageError`] and
//! keep the original error as the `source`.
//!
//! # Feature Flags
//!
//! - **`testutil`**: [`FailingBackend`](crate::testutil::FailingBackend) and assertion macros
//!   for integration tests.
//! - **`failpoints`**: Activates the `fail` crate's fail points inside [`MemoryBackend`].

#![deny(unsafe_code)]

pub mod backend;
pub mod error;
pub mod memory;
pub mod size_limits;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used, clippy::panic)]
pub mod testutil;

pub use backend::StorageBackend;
pub use error::{BoxError, ConfigError, StorageError, StorageResult};
pub use memory::MemoryBackend;
pub use size_limits::{
    DEFAULT_MAX_KEY_SIZE, DEFAULT_MAX_VALUE_SIZE, SizeLimits, validate_key_size, validate_sizes,
};
