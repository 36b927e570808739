//! SecretID issuance, indirection and revocation.
//!
//! A SecretID is a bearer credential bound to a role. This crate stores it
//! only as a keyed digest, hands out an opaque accessor for every SecretID so
//! operators can list and revoke without seeing the SecretID, and keeps both
//! consistent over a key-value store that has no transactions.
//!
//! # Layout
//!
//! ```text
//! secret_id/<digest(role)>/<digest(secret_id)>   SecretIdEntry
//! accessor/<digest(accessor)>                    AccessorEntry
//! secret_id_local/...  accessor_local/...        node-local scope
//! ```
//!
//! # Consistency
//!
//! - Registration is check, then lock upgrade, then re-check. Of two racing
//!   registrations of the same SecretID exactly one succeeds.
//! - The accessor entry is written before the SecretID entry.
//! - A role flush enumerates once; SecretIDs registered after the enumeration
//!   survive. Accessors left behind by a flush resolve to nothing and are
//!   reclaimed by tidy.
//! - Every operation takes an [`OperationContext`]; cancellation or a
//!   deadline aborts lock waits and storage calls and releases every lock.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use chrono::TimeDelta;
//! use warden_secret_id::{
//!     KeyedDigest, OperationContext, RoleBinding, SecretIdEntry, SecretIdRegistry, SecretIdScope,
//!     StaticSystemView,
//! };
//! use warden_storage::MemoryBackend;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = SecretIdRegistry::builder()
//!         .backend(MemoryBackend::new())
//!         .digest(KeyedDigest::new(b"per-mount key".to_vec())?)
//!         .system(Arc::new(StaticSystemView::new(TimeDelta::hours(24))))
//!         .build()?;
//!
//!     let ctx = OperationContext::new();
//!     let scope = SecretIdScope::Replicated;
//!     let role = RoleBinding::builder().name("web").build();
//!
//!     let entry = registry
//!         .register(&ctx, scope, &role, "s.alpha", SecretIdEntry::builder().num_uses(1).build())
//!         .await?;
//!     assert!(entry.expires_at.is_none());
//!
//!     assert_eq!(registry.flush_role(&ctx, scope, "web").await?, 1);
//!     assert!(registry.lookup_by_accessor(&ctx, scope, "web", &entry.accessor).await?.is_none());
//!     Ok(())
//! }
//! ```
//!
//! # Feature Flags
//!
//! - **`failpoints`**: Activates the `fail` crate's fail points in the registry and in
//!   `warden-storage`.

#![deny(unsafe_code)]

pub mod accessor;
pub mod cidr;
pub mod config;
pub mod context;
pub mod digest;
pub mod entry;
pub mod error;
pub mod locks;
pub mod metrics;
pub mod registry;
pub mod ttl;

pub use accessor::AccessorIndex;
pub use config::{DEFAULT_LOCK_COUNT, SecretIdConfig};
pub use context::OperationContext;
pub use digest::{KeyedDigest, MAX_DIGEST_INPUT_LEN};
pub use entry::{AccessorEntry, SecretIdEntry, SecretIdScope};
pub use error::{DigestError, Result, SecretIdError};
pub use locks::{LockStripe, SecretIdLocks};
pub use metrics::{SecretIdMetrics, SecretIdMetricsSnapshot};
pub use registry::{RoleBinding, SecretIdRegistry, TidyStats};
pub use ttl::{StaticSystemView, SystemView};
