// Operation scopes: cooperative cancellation, deadlines and carried values

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a scope stopped accepting work
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeError {
    /// The scope (or one of its ancestors) was cancelled by its owner
    #[error("operation cancelled")]
    Cancelled,

    /// The effective deadline of the scope elapsed
    #[error("operation deadline exceeded")]
    DeadlineExceeded,
}

/// Caller-defined values riding along with a scope, keyed by type.
/// The request pipeline hands these to the transport without reading them.
#[derive(Clone, Default)]
struct Values(Arc<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>);

/// Cancellable, deadline-bearing handle threaded through every API operation
///
/// Derived scopes (`with_timeout`, `with_deadline`, `child`) get a child
/// cancellation token, so cancelling the parent ends every derived scope while
/// cancelling a derived scope leaves the parent untouched. The effective
/// deadline of a derived scope is always the nearer of the parent's and its own.
///
/// Dropping a derived scope releases its token from the parent.
#[derive(Clone)]
pub struct OperationScope {
    token: CancellationToken,
    deadline: Option<Instant>,
    values: Values,
}

impl OperationScope {
    /// Root scope: never cancelled unless `cancel` is called, no deadline
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
            values: Values::default(),
        }
    }

    /// Derive a scope that additionally expires after `timeout`
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self.child(),
        }
    }

    /// Derive a scope that additionally expires at `deadline`
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let effective = match self.deadline {
            Some(parent) => parent.min(deadline),
            None => deadline,
        };

        Self {
            token: self.token.child_token(),
            deadline: Some(effective),
            values: self.values.clone(),
        }
    }

    /// Derive a scope with the same deadline that can be cancelled on its own
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
            values: self.values.clone(),
        }
    }

    /// Attach a caller-defined value. Shares cancellation with `self`.
    pub fn with_value<T: Any + Send + Sync>(&self, value: T) -> Self {
        let mut values: HashMap<TypeId, Arc<dyn Any + Send + Sync>> = (*self.values.0).clone();
        values.insert(TypeId::of::<T>(), Arc::new(value));

        Self {
            token: self.token.clone(),
            deadline: self.deadline,
            values: Values(Arc::new(values)),
        }
    }

    /// Look up a value previously attached with `with_value`
    pub fn value<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.values
            .0
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    /// Cancel this scope and everything derived from it
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Effective deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left until the deadline (zero once it has passed)
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Non-blocking check. Explicit cancellation wins over an elapsed deadline.
    pub fn check(&self) -> Result<(), ScopeError> {
        if self.token.is_cancelled() {
            return Err(ScopeError::Cancelled);
        }

        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(ScopeError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    pub fn is_done(&self) -> bool {
        self.check().is_err()
    }

    /// Resolves once the scope is cancelled or its deadline elapses
    pub async fn done(&self) -> ScopeError {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    _ = self.token.cancelled() => ScopeError::Cancelled,
                    _ = tokio::time::sleep_until(deadline) => ScopeError::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                ScopeError::Cancelled
            }
        }
    }

    /// Drive `fut` to completion unless the scope ends first.
    /// The future is dropped as soon as the scope is done.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, ScopeError>
    where
        F: Future,
    {
        self.check()?;

        tokio::select! {
            biased;
            err = self.done() => Err(err),
            output = fut => Ok(output),
        }
    }
}

impl Default for OperationScope {
    fn default() -> Self {
        Self::background()
    }
}

impl fmt::Debug for OperationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationScope")
            .field("cancelled", &self.token.is_cancelled())
            .field("deadline", &self.deadline)
            .field("values", &self.values.0.len())
            .finish()
    }
}
