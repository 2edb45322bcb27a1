//! Synchronization for the one-writer contract.
//!
//! Parsing and grid mutation are synchronous and single-writer (§
//! [`crate`] module docs). Embedders that split PTY reading and rendering
//! across threads wrap the [`Terminal`](crate::terminal::Terminal) in a
//! [`FairMutex`] and hold the lock for the duration of one `process` batch
//! or one render copy.
//!
//! A plain mutex starves: the PTY thread releases and immediately
//! re-acquires the lock in a tight loop, and the render thread may never
//! get a turn. `FairMutex` uses two locks (`next` serializes intent,
//! `data` protects the terminal) so a waiting thread is guaranteed the
//! next turn. The [`lease`](FairMutex::lease) API lets the render thread
//! reserve its turn, do frame preparation, then take the data lock without
//! re-queueing.

use std::fmt;

use parking_lot::{Mutex, MutexGuard};

/// A fairness-preserving mutex for terminal state.
pub struct FairMutex<T> {
    /// The protected data.
    data: Mutex<T>,
    /// Serializes access intent to ensure fairness.
    next: Mutex<()>,
}

/// A reserved turn on a [`FairMutex`]. Holding a lease blocks other fair
/// lockers; convert it with [`FairMutex::lock_with_lease`] or drop it to
/// release the reservation.
pub struct Lease<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl<T> FairMutex<T> {
    /// Create a mutex holding `data`.
    #[inline]
    pub const fn new(data: T) -> Self {
        Self {
            data: Mutex::new(data),
            next: Mutex::new(()),
        }
    }

    /// Acquire the lock fairly: waiters queued before this call run first.
    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, T> {
        // The binding keeps the queue position until the data lock is held.
        let _next = self.next.lock();
        self.data.lock()
    }

    /// Reserve the next turn without taking the data lock yet.
    #[inline]
    pub fn lease(&self) -> Lease<'_> {
        Lease {
            _guard: self.next.lock(),
        }
    }

    /// Try to reserve the next turn without blocking.
    #[inline]
    pub fn try_lease(&self) -> Option<Lease<'_>> {
        self.next.try_lock().map(|guard| Lease { _guard: guard })
    }

    /// Convert a reservation into the data lock.
    #[inline]
    pub fn lock_with_lease(&self, _lease: Lease<'_>) -> MutexGuard<'_, T> {
        self.data.lock()
    }

    /// Acquire the data lock directly, skipping the fairness queue. Heavy
    /// use starves fair lockers.
    #[inline]
    pub fn lock_unfair(&self) -> MutexGuard<'_, T> {
        self.data.lock()
    }

    /// Try the data lock without blocking or queueing.
    #[inline]
    pub fn try_lock_unfair(&self) -> Option<MutexGuard<'_, T>> {
        self.data.try_lock()
    }

    /// Exclusive access without locking (requires `&mut self`).
    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// Consume the mutex, returning the data.
    #[inline]
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: fmt::Debug> fmt::Debug for FairMutex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.try_lock_unfair() {
            Some(guard) => f.debug_struct("FairMutex").field("data", &*guard).finish(),
            None => f.debug_struct("FairMutex").field("data", &"<locked>").finish(),
        }
    }
}

impl<T: Default> Default for FairMutex<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn lock_and_mutate() {
        let mutex = FairMutex::new(41);
        *mutex.lock() += 1;
        assert_eq!(*mutex.lock(), 42);
    }

    #[test]
    fn lease_converts_to_lock() {
        let mutex = FairMutex::new(String::from("a"));
        let lease = mutex.lease();
        let mut guard = mutex.lock_with_lease(lease);
        guard.push('b');
        drop(guard);
        assert_eq!(*mutex.lock(), "ab");
    }

    #[test]
    fn try_lease_fails_while_leased() {
        let mutex = FairMutex::new(0);
        let lease = mutex.lease();
        assert!(mutex.try_lease().is_none());
        drop(lease);
        assert!(mutex.try_lease().is_some());
    }

    #[test]
    fn try_lock_unfair_fails_while_locked() {
        let mutex = FairMutex::new(0);
        let guard = mutex.lock();
        assert!(mutex.try_lock_unfair().is_none());
        drop(guard);
        assert!(mutex.try_lock_unfair().is_some());
    }

    #[test]
    fn concurrent_increments_are_serialized() {
        let mutex = Arc::new(FairMutex::new(0u64));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let mutex = Arc::clone(&mutex);
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    *mutex.lock() += 1;
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(*mutex.lock(), 4000);
    }
}
