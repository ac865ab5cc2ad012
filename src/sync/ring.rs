//! Ring of binary resources with deadlock-free pairwise acquisition.
//!
//! N actors sit in a cycle with one binary resource between each neighbour
//! pair. Actor `i` needs its left resource `i` and its right resource
//! `(i + 1) % N` at the same time.
//!
//! If every actor took left then right, all N could hold their left resource
//! and wait on the right one forever. The ring avoids that by naming one
//! *reversed participant* that takes right first, then left. Its wait edge
//! points the other way, so the wait-for graph can never close into a cycle.
//! This holds for any N ≥ 2 and any schedule. Fairness is not promised: an
//! actor can lose the race for a resource many times in a row.
//!
//! Release walks the same order as acquisition.

use std::sync::atomic::{AtomicUsize, Ordering};

use super::semaphore::Semaphore;
use crate::error::{ConfigError, Result};

const NO_HOLDER: usize = usize::MAX;

/// N binary resources shared by N actors arranged in a cycle.
#[derive(Debug)]
pub struct ResourceRing {
    resources: Box<[Semaphore]>,
    holders: Box<[AtomicUsize]>,
    reversed: usize,
}

impl ResourceRing {
    /// Smallest ring that has two distinct resources per actor.
    pub const MIN_PARTICIPANTS: usize = 2;

    /// Creates a ring of `participants` actors where the last actor,
    /// `participants - 1`, takes its resources in reverse order.
    pub fn new(participants: usize) -> Result<Self> {
        Self::check_participants(participants)?;
        Self::with_reversed(participants, participants - 1)
    }

    /// Creates a ring where actor `reversed` takes its right resource first.
    pub fn with_reversed(participants: usize, reversed: usize) -> Result<Self> {
        Self::check_participants(participants)?;
        if reversed >= participants {
            return Err(ConfigError::ReversedIndexOutOfRange {
                index: reversed,
                participants,
            });
        }
        Ok(Self {
            resources: (0..participants).map(|_| Semaphore::new(1)).collect(),
            holders: (0..participants)
                .map(|_| AtomicUsize::new(NO_HOLDER))
                .collect(),
            reversed,
        })
    }

    fn check_participants(participants: usize) -> Result<()> {
        if participants < Self::MIN_PARTICIPANTS {
            return Err(ConfigError::TooFewParticipants {
                participants,
                minimum: Self::MIN_PARTICIPANTS,
            });
        }
        Ok(())
    }

    /// Returns the number of actors (and resources).
    #[must_use]
    pub fn participants(&self) -> usize {
        self.resources.len()
    }

    /// Returns the actor that acquires right before left.
    #[must_use]
    pub fn reversed_participant(&self) -> usize {
        self.reversed
    }

    /// Returns the resources `actor` takes, in the order it takes them.
    ///
    /// # Panics
    ///
    /// Panics if `actor` is not seated at the ring.
    #[must_use]
    pub fn acquisition_order(&self, actor: usize) -> [usize; 2] {
        let n = self.participants();
        assert!(actor < n, "actor {actor} is not seated at a ring of {n}");
        let (left, right) = (actor, (actor + 1) % n);
        if actor == self.reversed {
            [right, left]
        } else {
            [left, right]
        }
    }

    /// Returns the actor currently holding `resource`, if any.
    #[must_use]
    pub fn holder(&self, resource: usize) -> Option<usize> {
        match self.holders[resource].load(Ordering::SeqCst) {
            NO_HOLDER => None,
            actor => Some(actor),
        }
    }

    /// Blocks until `actor` holds both of its resources.
    ///
    /// # Panics
    ///
    /// Panics if `actor` is not seated at the ring, if it already holds one
    /// of its resources, or if a resource is ever observed held by two actors
    /// at once.
    pub fn acquire(&self, actor: usize) {
        for resource in self.acquisition_order(actor) {
            // Waiting on our own resource would never return.
            assert_ne!(
                self.holder(resource),
                Some(actor),
                "actor {actor} already holds resource {resource}"
            );
            self.resources[resource].wait();
            if let Err(other) = self.holders[resource].compare_exchange(
                NO_HOLDER,
                actor,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                panic!("actor {actor} acquired resource {resource} still held by actor {other}");
            }
            tracing::trace!(actor, resource, "ring::acquire");
        }
    }

    /// Gives back both resources held by `actor`.
    ///
    /// # Panics
    ///
    /// Panics if `actor` does not hold both of its resources. Nothing is
    /// released in that case.
    pub fn release(&self, actor: usize) {
        let order = self.acquisition_order(actor);
        for resource in order {
            let holder = self.holder(resource);
            assert!(
                holder == Some(actor),
                "actor {actor} released resource {resource} it does not hold (holder: {holder:?})"
            );
        }
        for resource in order {
            self.holders[resource].store(NO_HOLDER, Ordering::SeqCst);
            self.resources[resource].signal();
            tracing::trace!(actor, resource, "ring::release");
        }
    }

    /// Acquires both resources for `actor` and returns a guard that releases
    /// them on drop.
    pub fn hold(&self, actor: usize) -> HeldPair<'_> {
        self.acquire(actor);
        HeldPair { ring: self, actor }
    }
}

/// Both resources of one actor, released when dropped.
#[derive(Debug)]
#[must_use = "dropping the pair releases both resources immediately"]
pub struct HeldPair<'a> {
    ring: &'a ResourceRing,
    actor: usize,
}

impl HeldPair<'_> {
    /// Returns the actor holding the pair.
    #[must_use]
    pub fn actor(&self) -> usize {
        self.actor
    }
}

impl Drop for HeldPair<'_> {
    fn drop(&mut self) {
        self.ring.release(self.actor);
    }
}
