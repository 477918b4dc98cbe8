use std::collections::VecDeque;

/// A trait for values that can be managed by a [`Pool`](crate::Pool).
///
/// The pool calls [`Poolable::reset`] every time an instance is released,
/// before any other caller can observe it. Implementations restore the
/// caller-visible state to a fixed baseline while keeping the instance
/// itself (and any expensive allocation it owns) alive.
pub trait Poolable {
    /// Restores the mutable state of the object to its baseline.
    ///
    /// This must not fail and must be idempotent: resetting an already
    /// reset object has no observable effect.
    fn reset(&mut self);
}

impl<T> Poolable for Vec<T> {
    #[inline(always)]
    fn reset(&mut self) {
        self.clear()
    }
}

impl<T> Poolable for VecDeque<T> {
    #[inline(always)]
    fn reset(&mut self) {
        self.clear()
    }
}

impl Poolable for String {
    #[inline(always)]
    fn reset(&mut self) {
        self.clear()
    }
}
