use crate::{pool::Member, Pool, Poolable};
use std::{
    borrow::{Borrow, BorrowMut},
    fmt,
    mem::ManuallyDrop,
    ops::{Deref, DerefMut},
    sync::Arc,
};

/// A checked-out object borrowed from a [`Pool`].
///
/// The object goes back to the pool, reset, when the lease is dropped.
pub struct Lease<'a, T: Poolable> {
    member: ManuallyDrop<Member<T>>,
    pool: &'a Pool<T>,
}

impl<'a, T: Poolable> Lease<'a, T> {
    pub(crate) fn new(member: Member<T>, pool: &'a Pool<T>) -> Self {
        Lease {
            member: ManuallyDrop::new(member),
            pool,
        }
    }

    /// Gets the slot of the leased object. Slots are assigned at pool
    /// construction and identify the same object for the pool's lifetime.
    pub fn slot(&self) -> usize {
        self.member.slot
    }

    /// Gets the id of the pool that issued this lease.
    pub fn pool_id(&self) -> u64 {
        self.pool.id()
    }
}

impl<T: Poolable> Deref for Lease<'_, T> {
    type Target = T;

    #[inline(always)]
    fn deref(&self) -> &Self::Target {
        &self.member.value
    }
}

impl<T: Poolable> DerefMut for Lease<'_, T> {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.member.value
    }
}

impl<T: Poolable> Drop for Lease<'_, T> {
    fn drop(&mut self) {
        // SAFETY: `member` is only taken here, and drop runs once.
        let member = unsafe { ManuallyDrop::take(&mut self.member) };
        self.pool.put_back(member);
    }
}

impl<T: Poolable + fmt::Debug> fmt::Debug for Lease<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease")
            .field("slot", &self.slot())
            .field("value", &**self)
            .finish()
    }
}

impl<T: Poolable + fmt::Display> fmt::Display for Lease<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&**self, f)
    }
}

impl<T: Poolable> Borrow<T> for Lease<'_, T> {
    #[inline(always)]
    fn borrow(&self) -> &T {
        self
    }
}

impl<T: Poolable> BorrowMut<T> for Lease<'_, T> {
    #[inline(always)]
    fn borrow_mut(&mut self) -> &mut T {
        self
    }
}

impl<T: Poolable> AsRef<T> for Lease<'_, T> {
    #[inline(always)]
    fn as_ref(&self) -> &T {
        self
    }
}

impl<T: Poolable> AsMut<T> for Lease<'_, T> {
    #[inline(always)]
    fn as_mut(&mut self) -> &mut T {
        self
    }
}

/// A checked-out object that keeps its [`Pool`] alive through an [`Arc`].
///
/// Unlike [`Lease`] it is not tied to a borrow of the pool, so it can be
/// moved into spawned threads.
pub struct ArcLease<T: Poolable> {
    member: ManuallyDrop<Member<T>>,
    pool: Arc<Pool<T>>,
}

impl<T: Poolable> ArcLease<T> {
    pub(crate) fn new(member: Member<T>, pool: Arc<Pool<T>>) -> Self {
        ArcLease {
            member: ManuallyDrop::new(member),
            pool,
        }
    }

    /// Gets the slot of the leased object.
    pub fn slot(&self) -> usize {
        self.member.slot
    }

    /// Gets the id of the pool that issued this lease.
    pub fn pool_id(&self) -> u64 {
        self.pool.id()
    }

    /// Gets the pool that issued this lease.
    pub fn pool(&self) -> &Arc<Pool<T>> {
        &self.pool
    }
}

impl<T: Poolable> Deref for ArcLease<T> {
    type Target = T;

    #[inline(always)]
    fn deref(&self) -> &Self::Target {
        &self.member.value
    }
}

impl<T: Poolable> DerefMut for ArcLease<T> {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.member.value
    }
}

impl<T: Poolable> Drop for ArcLease<T> {
    fn drop(&mut self) {
        // SAFETY: `member` is only taken here, and drop runs once.
        let member = unsafe { ManuallyDrop::take(&mut self.member) };
        self.pool.put_back(member);
    }
}

impl<T: Poolable + fmt::Debug> fmt::Debug for ArcLease<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArcLease")
            .field("slot", &self.slot())
            .field("value", &**self)
            .finish()
    }
}

impl<T: Poolable + fmt::Display> fmt::Display for ArcLease<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&**self, f)
    }
}

impl<T: Poolable> Borrow<T> for ArcLease<T> {
    #[inline(always)]
    fn borrow(&self) -> &T {
        self
    }
}

impl<T: Poolable> AsRef<T> for ArcLease<T> {
    #[inline(always)]
    fn as_ref(&self) -> &T {
        self
    }
}
