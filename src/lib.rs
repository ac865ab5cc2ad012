//! Turnstile: classical inter-thread synchronization patterns built on a
//! single counting semaphore.
//!
//! # Overview
//!
//! Every blocking operation in this crate funnels into one primitive,
//! [`Semaphore::wait`]. The patterns layered on top of it are the textbook
//! ones, implemented so that their invariants hold under any preemptive
//! schedule of OS threads:
//!
//! - **Bounded buffer**: [`BoundedQueue`] blocks producers when full and
//!   consumers when empty, using a mutex semaphore plus free/filled counters.
//! - **Resource ring**: [`ResourceRing`] seats N actors around N binary
//!   resources and breaks circular wait by reversing the acquisition order of
//!   exactly one participant.
//! - **Rendezvous**: [`Rendezvous`] releases N actors once all of them have
//!   arrived, via a counter and a turnstile. It is single-use.
//! - **Reusable barrier**: [`Barrier`] adds a second turnstile and a
//!   generation counter so the same instance can synchronize many phases.
//!
//! # Module Structure
//!
//! - [`sync`]: the semaphore and the patterns built from it
//! - [`error`]: construction-time configuration errors
//! - [`config`]: scenario knobs with `TURNSTILE_*` environment overrides
//! - [`harness`]: threaded scenario drivers producing serializable reports
//! - [`util`]: deterministic PRNG for think/eat delays
//! - [`test_utils`]: tracing-based test logging and assertion macros
//!
//! # Blocking Is Not Failure
//!
//! None of the blocking calls time out or can be cancelled. A call to
//! [`Semaphore::wait`] returns only after a matching [`Semaphore::signal`];
//! callers must guarantee that every wait has a release path.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]

pub mod config;
pub mod error;
pub mod harness;
pub mod sync;
pub mod test_utils;
pub mod util;

pub use config::HarnessConfig;
pub use error::{ConfigError, Result};
pub use sync::{
    Arrival, Barrier, BarrierWaitResult, BoundedQueue, HeldPair, Rendezvous, ResourceRing,
    Semaphore, SemaphoreMutex, SemaphoreMutexGuard, SemaphorePermit,
};
