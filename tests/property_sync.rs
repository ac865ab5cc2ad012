//! Property-based tests for the semaphore patterns.
//!
//! # Queue Invariants
//! - Accounting: len == puts accepted - gets returned, always within 0..=capacity
//! - FIFO: items come out in the order they went in
//! - try_put fails exactly when full; try_get fails exactly when empty
//!
//! # Semaphore Invariants
//! - Conservation: initial + signals - successful try_waits == available
//! - try_wait succeeds exactly when a permit is banked
//!
//! # Ring Invariants
//! - Every actor takes exactly its two neighbouring resources
//! - Only the reversed participant takes right before left

#[macro_use]
mod common;

use common::*;
use proptest::prelude::*;
use std::collections::VecDeque;
use turnstile::{BoundedQueue, ResourceRing, Semaphore};

// ============================================================================
// Arbitrary Generators
// ============================================================================

#[derive(Debug, Clone)]
enum QueueOp {
    Put(u32),
    Get,
}

fn arb_queue_ops() -> impl Strategy<Value = Vec<QueueOp>> {
    proptest::collection::vec(
        prop_oneof![
            3 => any::<u32>().prop_map(QueueOp::Put),
            2 => Just(QueueOp::Get),
        ],
        0..=200,
    )
}

#[derive(Debug, Clone)]
enum SemOp {
    TryWait,
    Signal(usize),
}

fn arb_sem_ops() -> impl Strategy<Value = Vec<SemOp>> {
    proptest::collection::vec(
        prop_oneof![
            Just(SemOp::TryWait),
            (1_usize..=4).prop_map(SemOp::Signal),
        ],
        0..=128,
    )
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(test_proptest_config(300))]

    /// The queue behaves like a bounded VecDeque under any try_put/try_get mix.
    #[test]
    fn queue_matches_bounded_model(capacity in 1_usize..=16, ops in arb_queue_ops()) {
        init_test_logging();
        let queue = BoundedQueue::new(capacity).expect("queue");
        let mut model = VecDeque::new();

        for op in ops {
            match op {
                QueueOp::Put(item) => {
                    let accepted = queue.try_put(item);
                    if model.len() < capacity {
                        prop_assert_eq!(accepted, Ok(()));
                        model.push_back(item);
                    } else {
                        prop_assert_eq!(accepted, Err(item));
                    }
                }
                QueueOp::Get => {
                    prop_assert_eq!(queue.try_get(), model.pop_front());
                }
            }
            prop_assert_eq!(queue.len(), model.len());
            prop_assert!(queue.len() <= capacity);
            prop_assert_eq!(queue.is_full(), model.len() == capacity);
            prop_assert_eq!(queue.is_empty(), model.is_empty());
        }

        while let Some(expected) = model.pop_front() {
            prop_assert_eq!(queue.get(), expected);
        }
        prop_assert!(queue.try_get().is_none());
    }

    /// Permits are neither created nor lost by any single-threaded op sequence.
    #[test]
    fn semaphore_conserves_permits(initial in 0_usize..=8, ops in arb_sem_ops()) {
        init_test_logging();
        let sem = Semaphore::new(initial);
        let mut expected = initial;

        for op in ops {
            match op {
                SemOp::TryWait => {
                    let acquired = sem.try_wait();
                    prop_assert_eq!(acquired, expected > 0);
                    if acquired {
                        expected -= 1;
                    }
                }
                SemOp::Signal(count) => {
                    sem.signal_many(count);
                    expected += count;
                }
            }
            prop_assert_eq!(sem.available_permits(), expected);
            prop_assert_eq!(sem.waiters(), 0);
        }
    }

    /// Permit guards always give back what they took.
    #[test]
    fn permit_guards_restore_count(initial in 1_usize..=8, held in 0_usize..=8) {
        init_test_logging();
        let sem = Semaphore::new(initial);
        let permits: Vec<_> = (0..held).map_while(|_| sem.try_acquire()).collect();
        prop_assert_eq!(permits.len(), held.min(initial));
        prop_assert_eq!(sem.available_permits(), initial - permits.len());
        drop(permits);
        prop_assert_eq!(sem.available_permits(), initial);
    }

    /// Acquisition order covers both neighbours and reverses exactly one actor.
    #[test]
    fn ring_orders_are_neighbour_pairs(n in 2_usize..=32, reversed_seed in any::<usize>()) {
        let reversed = reversed_seed % n;
        let ring = ResourceRing::with_reversed(n, reversed).expect("ring");
        let mut right_first = 0;

        for actor in 0..n {
            let [first, second] = ring.acquisition_order(actor);
            let (left, right) = (actor, (actor + 1) % n);
            if first == right && second == left {
                right_first += 1;
                prop_assert_eq!(actor, reversed);
            } else {
                prop_assert_eq!((first, second), (left, right));
            }
        }
        prop_assert_eq!(right_first, 1);
    }
}
