//! Cancellation and deadlines for registry operations.
//!
//! Every registry operation takes an [`OperationContext`]. Lock acquisition
//! and storage calls race against the context's cancellation token and
//! deadline; whichever fires first ends the operation. Lock guards are plain
//! RAII values, so abandoning an operation at any await point releases
//! everything it held.

use std::{future::Future, time::Duration};

use tokio::{
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Instant,
};
use tokio_util::sync::CancellationToken;

use crate::error::{Result, SecretIdError};

/// Cancellation token plus optional deadline.
///
/// Cloning shares the token: cancelling any clone cancels all of them.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use warden_secret_id::OperationContext;
///
/// let ctx = OperationContext::new().with_timeout(Duration::from_secs(2));
/// assert!(ctx.deadline().is_some());
///
/// ctx.cancel();
/// assert!(ctx.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct OperationContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl OperationContext {
    /// A context that is never cancelled and has no deadline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A context driven by an existing cancellation token.
    #[must_use]
    pub fn with_token(token: CancellationToken) -> Self {
        Self { token, deadline: None }
    }

    /// Returns a copy with the deadline set to `timeout` from now.
    ///
    /// An existing earlier deadline is kept.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Returns a copy with the deadline set to `deadline`.
    ///
    /// An existing earlier deadline is kept.
    #[must_use]
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        };
        Self { token: self.token.clone(), deadline: Some(deadline) }
    }

    /// Applies `timeout` only if the context has no deadline yet.
    #[must_use]
    pub fn or_timeout(&self, timeout: Option<Duration>) -> Self {
        match (self.deadline, timeout) {
            (None, Some(timeout)) => self.with_timeout(timeout),
            _ => self.clone(),
        }
    }

    /// Returns the deadline, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the cancellation token.
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Cancels this context and every clone of it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns `true` if the context has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Fails if the context is already cancelled or past its deadline.
    ///
    /// # Errors
    ///
    /// [`SecretIdError::Cancelled`] or [`SecretIdError::DeadlineExceeded`].
    pub fn check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(SecretIdError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(SecretIdError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Drives `fut` to completion unless the context ends first.
    ///
    /// If the context ends first, `fut` is dropped and whatever it held is
    /// released.
    ///
    /// # Errors
    ///
    /// [`SecretIdError::Cancelled`] or [`SecretIdError::DeadlineExceeded`].
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output> {
        self.check()?;
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                () = self.token.cancelled() => Err(SecretIdError::Cancelled),
                () = tokio::time::sleep_until(deadline) => Err(SecretIdError::DeadlineExceeded),
                out = fut => Ok(out),
            },
            None => tokio::select! {
                biased;
                () = self.token.cancelled() => Err(SecretIdError::Cancelled),
                out = fut => Ok(out),
            },
        }
    }

    /// Acquires `lock` for reading, or fails when the context ends.
    ///
    /// # Errors
    ///
    /// [`SecretIdError::Cancelled`] or [`SecretIdError::DeadlineExceeded`].
    pub async fn read<'a>(&self, lock: &'a RwLock<()>) -> Result<RwLockReadGuard<'a, ()>> {
        self.run(lock.read()).await
    }

    /// Acquires `lock` for writing, or fails when the context ends.
    ///
    /// # Errors
    ///
    /// [`SecretIdError::Cancelled`] or [`SecretIdError::DeadlineExceeded`].
    pub async fn write<'a>(&self, lock: &'a RwLock<()>) -> Result<RwLockWriteGuard<'a, ()>> {
        self.run(lock.write()).await
    }
}
