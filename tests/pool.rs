use fixed_pool::*;
use std::{
    cell::Cell,
    collections::HashSet,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

static_assertions::assert_impl_all!(Pool<Vec<u8>>: Send, Sync);
static_assertions::assert_impl_all!(ArcLease<Vec<u8>>: Send, Sync);
static_assertions::assert_impl_all!(CancelToken: Send, Sync, Clone);

#[derive(Debug, Default)]
struct Counter {
    value: usize,
    resets: usize,
}

impl Poolable for Counter {
    fn reset(&mut self) {
        self.value = 0;
        self.resets += 1;
    }
}

#[test]
fn test_new_calls_factory_capacity_times() {
    let calls = Cell::new(0);
    let pool = Pool::new(5, || {
        calls.set(calls.get() + 1);
        Counter::default()
    });
    assert_eq!(calls.get(), 5);
    assert_eq!(pool.capacity(), 5);
    assert_eq!(pool.available(), 5);
    assert_eq!(
        pool.status(),
        PoolStatus {
            capacity: 5,
            available: 5,
            checked_out: 0,
            waiting: 0,
        }
    );
}

#[test]
fn test_try_new_aborts_on_factory_failure() {
    let created = Arc::new(AtomicUsize::new(0));
    let dropped = Arc::new(AtomicUsize::new(0));

    struct Tracked(Arc<AtomicUsize>);
    impl Drop for Tracked {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
    impl Poolable for Tracked {
        fn reset(&mut self) {}
    }

    let result = Pool::try_new(4, || {
        let n = created.fetch_add(1, Ordering::SeqCst);
        if n == 2 {
            Err("disk unavailable")
        } else {
            Ok(Tracked(dropped.clone()))
        }
    });

    let err = result.unwrap_err();
    assert_eq!(err.slot, 2);
    assert_eq!(err.capacity, 4);
    assert_eq!(err.into_source(), "disk unavailable");
    // The factory is not called again after the failure.
    assert_eq!(created.load(Ordering::SeqCst), 3);
    assert_eq!(dropped.load(Ordering::SeqCst), 2);
}

#[test]
fn test_create_error_message_and_source() {
    let err = Pool::<Counter>::try_new(3, || {
        Err(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"))
    })
    .unwrap_err();
    assert_eq!(err.to_string(), "failed to create pooled object 0 of 3");
    let source = std::error::Error::source(&err).unwrap();
    assert_eq!(source.to_string(), "missing");
}

#[test]
fn test_from_config_uses_label() {
    let config = PoolConfig::new(2).with_label("counters");
    let pool = Pool::from_config(&config, Counter::default);
    assert_eq!(pool.label(), "counters");
    assert_eq!(pool.capacity(), 2);
}

#[test]
fn test_zero_capacity_is_valid() {
    let pool = Pool::new(0, Counter::default);
    assert_eq!(pool.capacity(), 0);
    assert!(pool.is_empty());
    assert!(pool.try_acquire().is_none());
}

#[test]
fn test_held_leases_are_distinct() {
    let pool = Pool::new(4, Counter::default);
    let leases: Vec<_> = (0..4).map(|_| pool.acquire().unwrap()).collect();
    let slots: HashSet<_> = leases.iter().map(|l| l.slot()).collect();
    assert_eq!(slots.len(), 4);
    assert!(pool.try_acquire().is_none());

    let status = pool.status();
    assert_eq!(status.checked_out, 4);
    assert_eq!(status.available, 0);
    drop(leases);
    assert_eq!(pool.status().checked_out, 0);
    assert_eq!(pool.available(), 4);
}

#[test]
fn test_invariant_holds_across_checkouts() {
    let pool = Pool::new(3, Counter::default);
    let mut held = Vec::new();
    for _ in 0..3 {
        held.push(pool.acquire().unwrap());
        let status = pool.status();
        assert_eq!(status.checked_out + status.available, status.capacity);
    }
    while let Some(lease) = held.pop() {
        drop(lease);
        let status = pool.status();
        assert_eq!(status.checked_out + status.available, status.capacity);
    }
}

#[test]
fn test_release_resets_before_reuse() {
    let pool = Pool::new(1, Counter::default);
    let mut lease = pool.acquire().unwrap();
    lease.value = 42;
    let slot = lease.slot();
    pool.release(lease).unwrap();

    let lease = pool.acquire().unwrap();
    assert_eq!(lease.slot(), slot);
    assert_eq!(lease.value, 0);
    assert_eq!(lease.resets, 1);
}

#[test]
fn test_fresh_objects_are_not_reset() {
    let pool = Pool::new(2, Counter::default);
    let lease = pool.acquire().unwrap();
    assert_eq!(lease.resets, 0);
}

#[test]
fn test_release_foreign_lease_is_rejected() {
    let home = Pool::new(1, Counter::default);
    let other = Pool::new(1, Counter::default);

    let mut lease = home.acquire().unwrap();
    lease.value = 7;
    let err = other.release(lease).unwrap_err();
    assert_eq!(
        err,
        PoolError::NotOwnedByPool {
            pool: other.id(),
            lease_pool: home.id(),
        }
    );

    // The lease went back to the pool that issued it, and nowhere else.
    assert_eq!(home.available(), 1);
    assert_eq!(other.available(), 1);
    assert_eq!(home.acquire().unwrap().value, 0);
}

#[test]
fn test_arc_lease() {
    let pool = Pool::new(2, Counter::default).to_rc();
    let mut lease = pool.clone().acquire_arc().unwrap();
    lease.value = 3;
    assert_eq!(lease.pool_id(), pool.id());
    assert_eq!(pool.available(), 1);

    let handle = std::thread::spawn(move || {
        assert_eq!(lease.value, 3);
        drop(lease);
    });
    handle.join().unwrap();
    assert_eq!(pool.available(), 2);
}

#[test]
fn test_release_arc_checks_owner() {
    let home = Pool::new(1, Counter::default).to_rc();
    let other = Pool::new(1, Counter::default);

    let lease = home.clone().try_acquire_arc().unwrap();
    assert!(matches!(
        other.release_arc(lease),
        Err(PoolError::NotOwnedByPool { .. })
    ));
    assert_eq!(home.available(), 1);

    let lease = home.clone().try_acquire_arc().unwrap();
    home.release_arc(lease).unwrap();
    assert_eq!(home.available(), 1);
}

#[test]
fn test_std_buffers_are_poolable() {
    let pool = Pool::new(1, || Vec::<u8>::with_capacity(1024));
    let mut buf = pool.acquire().unwrap();
    buf.extend_from_slice(b"payload");
    drop(buf);

    let buf = pool.acquire().unwrap();
    assert!(buf.is_empty());
    assert!(buf.capacity() >= 1024);
}

#[test]
fn test_closed_pool_refuses_acquire() {
    let pool = Pool::new(2, Counter::default);
    let lease = pool.acquire().unwrap();
    pool.close();
    assert!(pool.is_closed());
    assert_eq!(pool.acquire().unwrap_err(), PoolError::Closed);
    assert!(pool.try_acquire().is_none());

    // Outstanding leases still come home.
    drop(lease);
    assert_eq!(pool.available(), 2);
}

#[test]
fn test_error_retryability() {
    assert!(PoolError::Cancelled.is_retryable());
    assert!(PoolError::Timeout { waited_ms: 1 }.is_retryable());
    assert!(!PoolError::Closed.is_retryable());
    assert!(!PoolError::InvalidCapacity(-1).is_retryable());
}
