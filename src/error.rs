//! Error types for pool operations.

use thiserror::Error;

/// Errors reported by [`Pool`](crate::Pool) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum PoolError {
    /// A blocked acquire was interrupted through its [`CancelToken`](crate::CancelToken).
    #[error("wait for a pooled object was cancelled")]
    Cancelled,

    /// No object became available before the deadline.
    #[error("timed out after {waited_ms}ms waiting for a pooled object")]
    Timeout {
        /// How long the caller waited.
        waited_ms: u128,
    },

    /// The pool was closed before an object could be handed out.
    #[error("pool is closed")]
    Closed,

    /// The released lease was issued by a different pool.
    #[error("lease was issued by pool {lease_pool}, not by pool {pool}")]
    NotOwnedByPool {
        /// The pool the lease was released to.
        pool: u64,
        /// The pool that issued the lease.
        lease_pool: u64,
    },

    /// The configured capacity cannot describe a pool.
    #[error("invalid pool capacity {0}")]
    InvalidCapacity(i64),
}

impl PoolError {
    /// Whether calling acquire again can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PoolError::Cancelled | PoolError::Timeout { .. })
    }
}

/// The factory failed while the pool was being filled.
///
/// Instances created before the failure are dropped; no partial pool exists.
#[derive(Debug, Error)]
#[error("failed to create pooled object {slot} of {capacity}")]
pub struct CreateError<E> {
    /// Index of the object the factory failed to produce.
    pub slot: usize,
    /// Capacity the pool was being built with.
    pub capacity: usize,
    /// The factory's own error.
    #[source]
    pub source: E,
}

impl<E> CreateError<E> {
    /// Consumes the error, returning the factory's error.
    pub fn into_source(self) -> E {
        self.source
    }
}
