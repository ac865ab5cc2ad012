//! Data guarded by a binary semaphore.
//!
//! [`SemaphoreMutex`] is the "mutex" of the classical patterns: a semaphore
//! created with one permit, owning the state it protects. Locking waits on the
//! semaphore; dropping the guard signals it. The data is reachable only
//! through the guard, so it is mutated only while the permit is held.

#![allow(unsafe_code)]

use std::cell::UnsafeCell;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

use super::semaphore::Semaphore;

/// Mutual exclusion built from a binary [`Semaphore`].
pub struct SemaphoreMutex<T> {
    sem: Semaphore,
    value: UnsafeCell<T>,
}

// SAFETY: `value` is only reachable through a guard, and at most one guard
// exists at a time because the semaphore never holds more than one permit.
unsafe impl<T: Send> Send for SemaphoreMutex<T> {}
// SAFETY: see above; sharing the mutex shares exclusive access, not `&T`.
unsafe impl<T: Send> Sync for SemaphoreMutex<T> {}

impl<T> SemaphoreMutex<T> {
    /// Creates an unlocked mutex owning `value`.
    #[must_use]
    pub const fn new(value: T) -> Self {
        Self {
            sem: Semaphore::new(1),
            value: UnsafeCell::new(value),
        }
    }

    /// Waits for the permit and returns a guard over the data.
    pub fn lock(&self) -> SemaphoreMutexGuard<'_, T> {
        self.sem.wait();
        SemaphoreMutexGuard {
            lock: self,
            _marker: PhantomData,
        }
    }

    /// Takes the permit if it is free.
    pub fn try_lock(&self) -> Option<SemaphoreMutexGuard<'_, T>> {
        self.sem.try_wait().then(|| SemaphoreMutexGuard {
            lock: self,
            _marker: PhantomData,
        })
    }

    /// Returns whether a guard is currently alive.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.sem.available_permits() == 0
    }

    /// Returns a mutable reference without locking; the borrow proves
    /// exclusivity.
    pub fn get_mut(&mut self) -> &mut T {
        self.value.get_mut()
    }

    /// Consumes the mutex, returning the data.
    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

impl<T: Default> Default for SemaphoreMutex<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> std::fmt::Debug for SemaphoreMutex<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemaphoreMutex")
            .field("locked", &self.is_locked())
            .finish_non_exhaustive()
    }
}

/// Exclusive access to the data of a [`SemaphoreMutex`].
///
/// Dropping the guard signals the semaphore.
#[must_use = "dropping the guard releases the lock immediately"]
pub struct SemaphoreMutexGuard<'a, T> {
    lock: &'a SemaphoreMutex<T>,
    // Makes the guard `Sync` only when `T: Sync`.
    _marker: PhantomData<&'a mut T>,
}

impl<T> Deref for SemaphoreMutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the guard holds the only permit.
        unsafe { &*self.lock.value.get() }
    }
}

impl<T> DerefMut for SemaphoreMutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard holds the only permit.
        unsafe { &mut *self.lock.value.get() }
    }
}

impl<T> Drop for SemaphoreMutexGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.sem.signal();
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for SemaphoreMutexGuard<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SemaphoreMutexGuard").field(&**self).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_test_logging;
    use std::sync::Arc;

    fn init_test(name: &str) {
        init_test_logging();
        crate::test_phase!(name);
    }

    #[test]
    fn guard_excludes_second_locker() {
        init_test("guard_excludes_second_locker");
        let mutex = SemaphoreMutex::new(0_u32);
        let guard = mutex.lock();
        let locked = mutex.is_locked();
        crate::assert_with_log!(locked, "locked while held", true, locked);
        assert!(mutex.try_lock().is_none());
        drop(guard);
        assert!(mutex.try_lock().is_some());
        crate::test_complete!("guard_excludes_second_locker");
    }

    #[test]
    fn non_atomic_increments_are_not_lost() {
        init_test("non_atomic_increments_are_not_lost");
        const THREADS: usize = 8;
        const ROUNDS: usize = 1_000;
        let counter = Arc::new(SemaphoreMutex::new(0_usize));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let counter = Arc::clone(&counter);
                std::thread::spawn(move || {
                    for _ in 0..ROUNDS {
                        let mut guard = counter.lock();
                        let read = *guard;
                        std::thread::yield_now();
                        *guard = read + 1;
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("incrementer panicked");
        }

        let total = *counter.lock();
        crate::assert_with_log!(
            total == THREADS * ROUNDS,
            "total increments",
            THREADS * ROUNDS,
            total
        );
        crate::test_complete!("non_atomic_increments_are_not_lost");
    }

    #[test]
    fn into_inner_returns_data() {
        init_test("into_inner_returns_data");
        let mut mutex = SemaphoreMutex::new(vec![1, 2]);
        mutex.get_mut().push(3);
        assert_eq!(mutex.into_inner(), vec![1, 2, 3]);
        crate::test_complete!("into_inner_returns_data");
    }
}
