use crate::{
    wait::{Signal, WaitState},
    ArcLease, CancelToken, CreateError, Lease, PoolConfig, PoolError, Poolable,
};
use crossbeam_queue::ArrayQueue;
use parking_lot::{Mutex, MutexGuard};
use std::{
    borrow::Cow,
    convert::Infallible,
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};
use tracing::{debug, error, trace, warn};

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// A pooled object together with the slot it was created for.
pub(crate) struct Member<T> {
    pub(crate) slot: usize,
    pub(crate) value: T,
}

/// A fixed-size pool of reusable objects.
///
/// Every object is created up front and lives as long as the pool. Objects
/// are checked out as leases; dropping a lease (or passing it to
/// [`Self::release`]) resets the object and makes it available again.
/// When the pool is empty, [`Self::acquire`] blocks until an object is
/// released, and blocked callers are served in arrival order.
pub struct Pool<T: Poolable> {
    id: u64,
    label: Cow<'static, str>,
    capacity: usize,
    storage: ArrayQueue<Member<T>>,
    // Objects assigned to a blocked acquirer that has not woken up yet.
    // Only touched with `signal.state` held (see `push_handoff`), which
    // stays free of `T` so a `CancelToken` can wake any pool.
    handoffs: Mutex<Vec<(u64, Member<T>)>>,
    signal: Arc<Signal>,
    closed: AtomicBool,
}

/// A snapshot of the pool's bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Total number of objects owned by the pool.
    pub capacity: usize,
    /// Objects ready to be acquired.
    pub available: usize,
    /// Objects held by callers, including those being handed to a waiter.
    pub checked_out: usize,
    /// Callers blocked in acquire.
    pub waiting: usize,
}

impl<T: Poolable> Pool<T> {
    /// Creates a pool holding `capacity` objects made by `factory`.
    ///
    /// The factory is called exactly `capacity` times before this returns.
    /// A capacity of zero is allowed; acquiring from such a pool only ends
    /// through cancellation, timeout or [`Self::close`].
    pub fn new(capacity: usize, factory: impl FnMut() -> T) -> Self {
        Self::from_config(&PoolConfig::new(capacity), factory)
    }

    /// Like [`Self::new`], but the factory may fail.
    ///
    /// The first failure aborts construction: objects created so far are
    /// dropped and the error is returned with the index of the failing slot.
    pub fn try_new<E>(
        capacity: usize,
        factory: impl FnMut() -> Result<T, E>,
    ) -> Result<Self, CreateError<E>> {
        Self::try_from_config(&PoolConfig::new(capacity), factory)
    }

    /// Creates a pool described by `config`.
    pub fn from_config(config: &PoolConfig, mut factory: impl FnMut() -> T) -> Self {
        match Self::try_from_config(config, || Ok::<_, Infallible>(factory())) {
            Ok(pool) => pool,
            Err(e) => match e.source {},
        }
    }

    /// Creates a pool described by `config` with a fallible factory.
    pub fn try_from_config<E>(
        config: &PoolConfig,
        mut factory: impl FnMut() -> Result<T, E>,
    ) -> Result<Self, CreateError<E>> {
        let capacity = config.capacity;
        // ArrayQueue cannot be empty-sized; a zero-capacity pool never pushes.
        let storage = ArrayQueue::new(capacity.max(1));
        for slot in 0..capacity {
            let value = factory().map_err(|source| {
                debug!(pool = %config.label, slot, capacity, "pool construction failed");
                CreateError {
                    slot,
                    capacity,
                    source,
                }
            })?;
            let pushed = storage.push(Member { slot, value });
            debug_assert!(pushed.is_ok(), "the queue holds at least `capacity` entries");
        }

        let id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);
        debug!(pool = %config.label, id, capacity, "pool created");
        Ok(Pool {
            id,
            label: config.label.clone(),
            capacity,
            storage,
            handoffs: Mutex::new(Vec::new()),
            signal: Arc::new(Signal::default()),
            closed: AtomicBool::new(false),
        })
    }

    /// Wraps the pool in an atomic reference counter, enabling
    /// [`Self::acquire_arc`] to hand out leases that own a reference to the
    /// pool instead of borrowing it.
    pub fn to_rc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Gets an object, blocking while none is available.
    ///
    /// Fails only with [`PoolError::Closed`].
    pub fn acquire(&self) -> Result<Lease<'_, T>, PoolError> {
        self.take(None, None).map(|member| Lease::new(member, self))
    }

    /// Gets an object, blocking until one is available or `token` is
    /// cancelled.
    ///
    /// An object handed to this caller before it notices the cancellation is
    /// still returned.
    pub fn acquire_cancellable(&self, token: &CancelToken) -> Result<Lease<'_, T>, PoolError> {
        self.take(None, Some(token)).map(|member| Lease::new(member, self))
    }

    /// Gets an object, giving up with [`PoolError::Timeout`] after `timeout`.
    pub fn acquire_timeout(&self, timeout: Duration) -> Result<Lease<'_, T>, PoolError> {
        self.take(Some(timeout), None).map(|member| Lease::new(member, self))
    }

    /// Attempts to get an object without blocking.
    ///
    /// Returns `None` if the pool is empty or closed.
    pub fn try_acquire(&self) -> Option<Lease<'_, T>> {
        self.try_take().map(|member| Lease::new(member, self))
    }

    /// Gets an object whose lease holds an arc reference to the pool, so it
    /// can be moved freely without being limited by a borrow of the pool.
    pub fn acquire_arc(self: Arc<Self>) -> Result<ArcLease<T>, PoolError> {
        let member = self.take(None, None)?;
        Ok(ArcLease::new(member, self))
    }

    /// [`Self::acquire_arc`] with a cancellation token.
    pub fn acquire_arc_cancellable(
        self: Arc<Self>,
        token: &CancelToken,
    ) -> Result<ArcLease<T>, PoolError> {
        let member = self.take(None, Some(token))?;
        Ok(ArcLease::new(member, self))
    }

    /// Attempts to get an arc lease without blocking.
    pub fn try_acquire_arc(self: Arc<Self>) -> Option<ArcLease<T>> {
        let member = self.try_take()?;
        Some(ArcLease::new(member, self))
    }

    /// Returns a lease to the pool.
    ///
    /// This is what dropping the lease does, but it also checks that the
    /// lease came from this pool. A lease from another pool is rejected with
    /// [`PoolError::NotOwnedByPool`] and goes back to the pool that issued it.
    pub fn release(&self, lease: Lease<'_, T>) -> Result<(), PoolError> {
        self.check_owner(lease.pool_id(), lease.slot())?;
        drop(lease);
        Ok(())
    }

    /// Returns an arc lease to the pool, checking ownership like
    /// [`Self::release`].
    pub fn release_arc(&self, lease: ArcLease<T>) -> Result<(), PoolError> {
        self.check_owner(lease.pool_id(), lease.slot())?;
        drop(lease);
        Ok(())
    }

    /// Closes the pool.
    ///
    /// Blocked and future acquires fail with [`PoolError::Closed`], except
    /// for a waiter that has already been handed an object. Outstanding
    /// leases can still be released.
    pub fn close(&self) {
        let mut state = self.signal.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        self.closed.store(true, Ordering::Release);
        debug!(pool = %self.label, waiting = state.waiting(), "pool closed");
        self.signal.cond.notify_all();
    }

    /// Checks whether [`Self::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Gets the number of objects currently ready to be acquired.
    pub fn available(&self) -> usize {
        self.storage.len()
    }

    /// Checks whether no object is ready to be acquired.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Gets the fixed number of objects owned by the pool.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Gets the label the pool was configured with.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Gets the process-unique identifier of this pool.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Takes a snapshot of the pool's bookkeeping.
    ///
    /// `waiting` is read under the wait lock. `available` comes from the
    /// lock-free store, which [`Self::try_acquire`] can drain concurrently,
    /// so it may already be stale; `checked_out` is derived from it and the
    /// two always add up to `capacity`.
    pub fn status(&self) -> PoolStatus {
        let state = self.signal.state.lock();
        let available = self.storage.len();
        PoolStatus {
            capacity: self.capacity,
            available,
            checked_out: self.capacity - available,
            waiting: state.waiting(),
        }
    }

    fn check_owner(&self, lease_pool: u64, slot: usize) -> Result<(), PoolError> {
        if lease_pool == self.id {
            return Ok(());
        }
        warn!(
            pool = %self.label,
            id = self.id,
            lease_pool,
            slot,
            "rejected release of a lease from another pool"
        );
        Err(PoolError::NotOwnedByPool {
            pool: self.id,
            lease_pool,
        })
    }

    fn try_take(&self) -> Option<Member<T>> {
        if self.is_closed() {
            return None;
        }
        let member = self.storage.pop()?;
        trace!(pool = %self.label, slot = member.slot, "acquired");
        Some(member)
    }

    fn take(
        &self,
        timeout: Option<Duration>,
        token: Option<&CancelToken>,
    ) -> Result<Member<T>, PoolError> {
        if token.is_some_and(CancelToken::is_cancelled) {
            return Err(PoolError::Cancelled);
        }
        if self.is_closed() {
            return Err(PoolError::Closed);
        }
        if let Some(member) = self.try_take() {
            return Ok(member);
        }
        self.wait(timeout, token)
    }

    /// Slow path of acquire: queue up and sleep until an object is handed
    /// over or the wait is aborted.
    fn wait(
        &self,
        timeout: Option<Duration>,
        token: Option<&CancelToken>,
    ) -> Result<Member<T>, PoolError> {
        let started = Instant::now();
        // A timeout too large to represent waits without a deadline.
        let deadline = timeout.and_then(|t| started.checked_add(t));
        // Registered before the first cancellation check so that a concurrent
        // cancel either is observed below or wakes us.
        let _listening = token.map(|t| t.listen(&self.signal));

        let mut state = self.signal.state.lock();
        // A release may have pushed after the lock-free pop failed. While any
        // ticket is queued the storage stays empty, so nobody can overtake us.
        if let Some(member) = self.storage.pop() {
            trace!(pool = %self.label, slot = member.slot, "acquired");
            return Ok(member);
        }
        let ticket = state.enqueue();
        trace!(pool = %self.label, ticket, "waiting for an object");

        loop {
            if let Some(member) = self.claim_handoff(&mut state, ticket) {
                trace!(pool = %self.label, ticket, slot = member.slot, "acquired after waiting");
                return Ok(member);
            }
            if let Some(err) = Self::abort_reason(&state, token, deadline, started) {
                state.dequeue(ticket);
                debug!(pool = %self.label, ticket, error = %err, "gave up waiting");
                return Err(err);
            }
            match deadline {
                Some(deadline) => {
                    self.signal.cond.wait_until(&mut state, deadline);
                }
                None => self.signal.cond.wait(&mut state),
            }
        }
    }

    fn abort_reason(
        state: &MutexGuard<'_, WaitState>,
        token: Option<&CancelToken>,
        deadline: Option<Instant>,
        started: Instant,
    ) -> Option<PoolError> {
        if state.closed {
            return Some(PoolError::Closed);
        }
        if token.is_some_and(CancelToken::is_cancelled) {
            return Some(PoolError::Cancelled);
        }
        match deadline {
            Some(deadline) if Instant::now() >= deadline => Some(PoolError::Timeout {
                waited_ms: started.elapsed().as_millis(),
            }),
            _ => None,
        }
    }

    /// Takes the object handed to `ticket`, if any. Checked before any abort
    /// reason, so a hand-off wins over cancellation, timeout and close.
    ///
    /// The `WaitState` borrow proves the wait lock is held, which keeps the
    /// lock order `state` then `handoffs` everywhere.
    fn claim_handoff(&self, _state: &mut WaitState, ticket: u64) -> Option<Member<T>> {
        let mut handoffs = self.handoffs.lock();
        let pos = handoffs.iter().position(|(t, _)| *t == ticket)?;
        Some(handoffs.swap_remove(pos).1)
    }

    fn push_handoff(&self, _state: &mut WaitState, ticket: u64, member: Member<T>) {
        self.handoffs.lock().push((ticket, member));
    }

    /// Release path shared by both lease types.
    pub(crate) fn put_back(&self, mut member: Member<T>) {
        member.value.reset();

        let mut state = self.signal.state.lock();
        if let Some(ticket) = state.next_waiter() {
            trace!(pool = %self.label, slot = member.slot, ticket, "handed off");
            self.push_handoff(&mut state, ticket, member);
            // Wakes every waiter; only the ticket owner proceeds.
            self.signal.cond.notify_all();
            return;
        }
        if let Err(member) = self.storage.push(member) {
            error!(
                pool = %self.label,
                slot = member.slot,
                capacity = self.capacity,
                "released object does not fit into the pool"
            );
            panic!(
                "pool {} received more objects than its capacity of {}",
                self.label, self.capacity
            );
        }
        trace!(pool = %self.label, available = self.storage.len(), "released");
    }
}

impl<T: Poolable> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("capacity", &self.capacity)
            .field("available", &self.storage.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
