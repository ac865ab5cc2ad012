//! Reusable N-party barrier built from semaphores.
//!
//! The barrier trips when `parties` callers have arrived. Exactly one caller
//! observes `is_leader = true` per generation.
//!
//! A single turnstile cannot be reused: a fast thread leaving one phase could
//! loop around and slip through the still-open gate of the next. Two
//! preloaded turnstiles close that window. The last arrival preloads the
//! entry turnstile with N permits; the last to leave preloads the exit
//! turnstile. No thread starts generation `g + 1` until every thread has
//! left generation `g`.

use super::guarded::SemaphoreMutex;
use super::semaphore::Semaphore;
use crate::error::{ConfigError, Result};

#[derive(Debug)]
struct BarrierState {
    count: usize,
    generation: u64,
}

/// Barrier for N-way rendezvous, reusable across phases.
#[derive(Debug)]
pub struct Barrier {
    parties: usize,
    state: SemaphoreMutex<BarrierState>,
    entry: Semaphore,
    exit: Semaphore,
}

impl Barrier {
    /// Creates a new barrier that trips when `parties` have arrived.
    pub fn new(parties: usize) -> Result<Self> {
        if parties == 0 {
            return Err(ConfigError::TooFewParticipants {
                participants: 0,
                minimum: 1,
            });
        }
        Ok(Self {
            parties,
            state: SemaphoreMutex::new(BarrierState {
                count: 0,
                generation: 0,
            }),
            entry: Semaphore::new(0),
            exit: Semaphore::new(0),
        })
    }

    /// Returns the number of parties required to trip the barrier.
    #[must_use]
    pub fn parties(&self) -> usize {
        self.parties
    }

    /// Returns the number of generations completed so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Waits for the barrier to trip.
    pub fn wait(&self) -> BarrierWaitResult {
        let (generation, is_leader) = {
            let mut state = self.state.lock();
            state.count += 1;
            let is_leader = state.count == self.parties;
            if is_leader {
                tracing::debug!(generation = state.generation, "barrier::wait leader");
                self.entry.signal_many(self.parties);
            }
            (state.generation, is_leader)
        };
        self.entry.wait();

        {
            let mut state = self.state.lock();
            state.count -= 1;
            if state.count == 0 {
                state.generation = state.generation.wrapping_add(1);
                self.exit.signal_many(self.parties);
            }
        }
        self.exit.wait();

        tracing::trace!(generation, is_leader, "barrier::wait released");
        BarrierWaitResult {
            is_leader,
            generation,
        }
    }
}

/// Result of a barrier wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarrierWaitResult {
    is_leader: bool,
    generation: u64,
}

impl BarrierWaitResult {
    /// Returns true for exactly one party (the leader) each generation.
    #[must_use]
    pub fn is_leader(&self) -> bool {
        self.is_leader
    }

    /// Returns the generation this wait belonged to, starting at zero.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
