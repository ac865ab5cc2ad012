//! Single-use rendezvous with a turnstile release.
//!
//! Each participant increments a shared arrival counter under a semaphore
//! mutex. The caller that brings the counter to N opens the gate with one
//! signal. Every participant then passes the turnstile: wait on the gate and
//! immediately signal it again, so the single permit is handed through all N
//! callers in turn.
//!
//! The counter is never reset and the gate is left open after the last
//! participant passes, so an instance synchronizes exactly one group of N.
//! Use [`Barrier`](super::Barrier) to synchronize repeated phases.

use super::guarded::SemaphoreMutex;
use super::semaphore::Semaphore;
use crate::error::{ConfigError, Result};

/// One-shot N-party rendezvous point.
#[derive(Debug)]
pub struct Rendezvous {
    parties: usize,
    arrived: SemaphoreMutex<usize>,
    gate: Semaphore,
}

/// What a participant learns when it leaves the rendezvous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arrival {
    order: usize,
    triggered: bool,
}

impl Arrival {
    /// Returns the 1-based position in which this caller arrived.
    #[must_use]
    pub fn order(&self) -> usize {
        self.order
    }

    /// Returns `true` for the caller whose arrival opened the gate.
    #[must_use]
    pub fn triggered_release(&self) -> bool {
        self.triggered
    }
}

impl Rendezvous {
    /// Creates a rendezvous that opens once `parties` callers have arrived.
    pub fn new(parties: usize) -> Result<Self> {
        if parties == 0 {
            return Err(ConfigError::TooFewParticipants {
                participants: parties,
                minimum: 1,
            });
        }
        Ok(Self {
            parties,
            arrived: SemaphoreMutex::new(0),
            gate: Semaphore::new(0),
        })
    }

    /// Returns the number of participants required to open the gate.
    #[must_use]
    pub fn parties(&self) -> usize {
        self.parties
    }

    /// Returns how many participants have arrived so far.
    #[must_use]
    pub fn arrived(&self) -> usize {
        *self.arrived.lock()
    }

    /// Returns `true` once every participant has arrived.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.arrived() == self.parties
    }

    /// Registers the caller and blocks until all participants have arrived.
    ///
    /// If fewer than N callers ever arrive, every caller blocks forever.
    ///
    /// # Panics
    ///
    /// Panics on an arrival beyond the configured number of participants;
    /// the rendezvous is single-use.
    pub fn arrive(&self) -> Arrival {
        let order = {
            let mut arrived = self.arrived.lock();
            assert!(
                *arrived < self.parties,
                "rendezvous for {} parties already used; arrival {} rejected",
                self.parties,
                *arrived + 1
            );
            *arrived += 1;
            *arrived
        };
        tracing::trace!(order, parties = self.parties, "rendezvous::arrive");

        let triggered = order == self.parties;
        if triggered {
            tracing::debug!(parties = self.parties, "rendezvous::open");
            self.gate.signal();
        }

        self.gate.wait();
        self.gate.signal();

        Arrival { order, triggered }
    }
}
