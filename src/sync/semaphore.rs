//! Counting semaphore with direct hand-off to blocked waiters.
//!
//! A semaphore holds a non-negative count of permits. [`Semaphore::wait`]
//! takes one, blocking while none are available; [`Semaphore::signal`]
//! returns one and wakes at most one blocked waiter.
//!
//! # Hand-off
//!
//! A thread that blocks in `wait` draws a ticket. When `signal` finds blocked
//! waiters, it grants the oldest outstanding ticket instead of adding to the
//! public count, and only the holder of that ticket may claim it. A thread
//! that calls `wait` afterwards draws a later ticket and blocks behind it, so
//! a signalled waiter always completes its wait. Blocked waiters are
//! therefore released in the order they started waiting.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use turnstile::Semaphore;
//!
//! let sem = Arc::new(Semaphore::new(0));
//! let worker = {
//!     let sem = Arc::clone(&sem);
//!     std::thread::spawn(move || sem.wait())
//! };
//! sem.signal();
//! worker.join().unwrap();
//! assert_eq!(sem.available_permits(), 0);
//! ```

use parking_lot::{Condvar, Mutex};

use crate::error::{ConfigError, Result};

/// A counting semaphore for OS threads.
///
/// Waiters always hold a borrow of the semaphore, so it cannot be dropped
/// while any thread is blocked inside [`wait`](Self::wait).
#[derive(Debug)]
pub struct Semaphore {
    state: Mutex<SemaphoreState>,
    cvar: Condvar,
}

#[derive(Debug)]
struct SemaphoreState {
    /// Permits available to any caller.
    permits: usize,
    /// Ticket drawn by the next thread that blocks.
    next_ticket: u64,
    /// Tickets below this value have been granted a permit.
    granted: u64,
}

impl SemaphoreState {
    fn waiters(&self) -> usize {
        usize::try_from(self.next_ticket - self.granted).unwrap_or(usize::MAX)
    }
}

impl Semaphore {
    /// Creates a semaphore holding `permits` permits.
    #[must_use]
    pub const fn new(permits: usize) -> Self {
        Self {
            state: Mutex::new(SemaphoreState {
                permits,
                next_ticket: 0,
                granted: 0,
            }),
            cvar: Condvar::new(),
        }
    }

    /// Creates a semaphore from a signed count, as read from external
    /// configuration.
    ///
    /// A negative count is rejected rather than clamped to zero.
    pub fn from_signed(permits: i64) -> Result<Self> {
        usize::try_from(permits)
            .map(Self::new)
            .map_err(|_| ConfigError::NegativePermits { permits })
    }

    /// Returns the number of permits available right now.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.state.lock().permits
    }

    /// Returns the number of threads blocked in [`wait`](Self::wait) that
    /// have not yet been granted a permit.
    #[must_use]
    pub fn waiters(&self) -> usize {
        self.state.lock().waiters()
    }

    /// Takes a permit, blocking the current thread until one is available.
    pub fn wait(&self) {
        let mut state = self.state.lock();
        if state.permits > 0 {
            state.permits -= 1;
            tracing::trace!(permits = state.permits, "semaphore::wait acquired");
            return;
        }

        let ticket = state.next_ticket;
        state.next_ticket += 1;
        tracing::trace!(ticket, waiters = state.waiters(), "semaphore::wait blocking");
        while ticket >= state.granted {
            self.cvar.wait(&mut state);
        }
        tracing::trace!(ticket, waiters = state.waiters(), "semaphore::wait woken");
    }

    /// Takes a permit if one is available, without blocking.
    ///
    /// Returns `true` if a permit was taken.
    pub fn try_wait(&self) -> bool {
        let mut state = self.state.lock();
        if state.permits == 0 {
            return false;
        }
        state.permits -= 1;
        true
    }

    /// Returns one permit, waking a blocked waiter if there is one.
    ///
    /// Never blocks.
    pub fn signal(&self) {
        self.signal_many(1);
    }

    /// Returns `count` permits at once.
    ///
    /// Up to `count` of the longest-blocked waiters are woken; whatever is
    /// left over is added to the available count.
    pub fn signal_many(&self, count: usize) {
        if count == 0 {
            return;
        }
        let mut state = self.state.lock();
        let handoff = count.min(state.waiters());
        state.granted += handoff as u64;
        state.permits = state
            .permits
            .checked_add(count - handoff)
            .expect("semaphore permit count overflow");
        tracing::trace!(
            count,
            handoff,
            permits = state.permits,
            "semaphore::signal"
        );
        drop(state);
        // Granted tickets belong to specific threads; wake them all to recheck.
        if handoff > 0 {
            self.cvar.notify_all();
        }
    }

    /// Takes a permit and returns a guard that gives it back on drop.
    pub fn acquire(&self) -> SemaphorePermit<'_> {
        self.wait();
        SemaphorePermit { semaphore: self }
    }

    /// Takes a permit if one is available and returns a guard for it.
    pub fn try_acquire(&self) -> Option<SemaphorePermit<'_>> {
        self.try_wait().then(|| SemaphorePermit { semaphore: self })
    }
}

/// A permit taken from a [`Semaphore`], returned when dropped.
#[derive(Debug)]
#[must_use = "dropping the permit signals the semaphore immediately"]
pub struct SemaphorePermit<'a> {
    semaphore: &'a Semaphore,
}

impl SemaphorePermit<'_> {
    /// Consumes the permit without signalling the semaphore.
    pub fn forget(self) {
        std::mem::forget(self);
    }
}

impl Drop for SemaphorePermit<'_> {
    fn drop(&mut self) {
        self.semaphore.signal();
    }
}
