use parking_lot::{Condvar, Mutex};
use std::{
    collections::VecDeque,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Weak,
    },
};

/// Bookkeeping for acquirers blocked on an empty pool.
///
/// Tickets are served in arrival order. The state never holds pooled
/// objects, so a [`CancelToken`] can wake waiters without knowing the
/// object type.
#[derive(Debug, Default)]
pub(crate) struct WaitState {
    waiters: VecDeque<u64>,
    next_ticket: u64,
    pub(crate) closed: bool,
}

impl WaitState {
    pub(crate) fn enqueue(&mut self) -> u64 {
        let ticket = self.next_ticket;
        self.next_ticket = self.next_ticket.wrapping_add(1);
        self.waiters.push_back(ticket);
        ticket
    }

    /// Removes a ticket that gave up waiting.
    pub(crate) fn dequeue(&mut self, ticket: u64) {
        if let Some(pos) = self.waiters.iter().position(|t| *t == ticket) {
            self.waiters.remove(pos);
        }
    }

    /// Pops the oldest waiter, which will receive the next released object.
    pub(crate) fn next_waiter(&mut self) -> Option<u64> {
        self.waiters.pop_front()
    }

    pub(crate) fn waiting(&self) -> usize {
        self.waiters.len()
    }
}

#[derive(Debug, Default)]
pub(crate) struct Signal {
    pub(crate) state: Mutex<WaitState>,
    pub(crate) cond: Condvar,
}

impl Signal {
    /// Wakes every waiter so it re-evaluates its exit conditions.
    ///
    /// Taking the lock orders the wakeup after any waiter that is between
    /// checking its conditions and going to sleep.
    pub(crate) fn interrupt(&self) {
        let _state = self.state.lock();
        self.cond.notify_all();
    }
}

/// A handle used to abort blocked acquires from another thread.
///
/// Pass it to [`Pool::acquire_cancellable`](crate::Pool::acquire_cancellable);
/// calling [`CancelToken::cancel`] makes every such call that is waiting, or
/// that starts later, fail with [`PoolError::Cancelled`](crate::PoolError::Cancelled).
/// Clones share the same cancellation state.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<TokenInner>,
}

#[derive(Default)]
struct TokenInner {
    cancelled: AtomicBool,
    listeners: Mutex<Vec<Weak<Signal>>>,
}

impl CancelToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the token and wakes all acquirers waiting with it.
    ///
    /// Cancelling twice has no further effect.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        let listeners = core::mem::take(&mut *self.inner.listeners.lock());
        for signal in listeners.iter().filter_map(Weak::upgrade) {
            signal.interrupt();
        }
    }

    /// Checks whether [`Self::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Registers a pool's signal for the duration of a wait.
    pub(crate) fn listen(&self, signal: &Arc<Signal>) -> Listening<'_> {
        self.inner.listeners.lock().push(Arc::downgrade(signal));
        Listening {
            token: self,
            signal: Arc::downgrade(signal),
        }
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Unregisters the signal when the wait ends.
pub(crate) struct Listening<'a> {
    token: &'a CancelToken,
    signal: Weak<Signal>,
}

impl Drop for Listening<'_> {
    fn drop(&mut self) {
        let mut listeners = self.token.inner.listeners.lock();
        if let Some(pos) = listeners.iter().position(|s| s.ptr_eq(&self.signal)) {
            listeners.swap_remove(pos);
        }
    }
}
