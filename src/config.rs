use crate::PoolError;
use std::borrow::Cow;

/// Configuration for a [`Pool`](crate::Pool).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of objects created up front. Never changes afterwards.
    pub capacity: usize,
    /// Name attached to the pool's log records.
    pub label: Cow<'static, str>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: 8,
            label: Cow::Borrowed("pool"),
        }
    }
}

impl PoolConfig {
    /// Creates a configuration with the given capacity and the default label.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Sets the capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the label used in log records.
    pub fn with_label(mut self, label: impl Into<Cow<'static, str>>) -> Self {
        self.label = label.into();
        self
    }

    /// Validates a signed capacity, e.g. one parsed from an environment
    /// variable or a settings file.
    pub fn capacity_from_signed(capacity: i64) -> Result<usize, PoolError> {
        usize::try_from(capacity).map_err(|_| PoolError::InvalidCapacity(capacity))
    }
}
