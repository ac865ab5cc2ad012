//! Semaphore-based synchronization patterns for OS threads.
//!
//! Every blocking call in this module ends up in [`Semaphore::wait`]; nothing
//! else sleeps.
//!
//! # Primitives
//!
//! - [`Semaphore`]: counting semaphore with hand-off to blocked waiters
//! - [`SemaphoreMutex`]: data guarded by a binary semaphore
//! - [`BoundedQueue`]: fixed-capacity producer–consumer queue
//! - [`ResourceRing`]: cyclic pairwise resource contention without deadlock
//! - [`Rendezvous`]: single-use N-party meeting point with a turnstile
//! - [`Barrier`]: reusable N-party barrier with a double turnstile
//!
//! # Ordering of Acquisitions
//!
//! - Counting semaphore before mutex, in both queue operations.
//! - Left before right around the ring, except for one reversed participant.
//! - No primitive holds its mutex while waiting on another semaphore.

mod barrier;
mod guarded;
mod queue;
mod rendezvous;
mod ring;
mod semaphore;

pub use barrier::{Barrier, BarrierWaitResult};
pub use guarded::{SemaphoreMutex, SemaphoreMutexGuard};
pub use queue::BoundedQueue;
pub use rendezvous::{Arrival, Rendezvous};
pub use ring::{HeldPair, ResourceRing};
pub use semaphore::{Semaphore, SemaphorePermit};
