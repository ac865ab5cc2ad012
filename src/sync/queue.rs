//! Bounded producer–consumer queue built from three semaphores.
//!
//! The queue is a fixed ring of `capacity` slots guarded by:
//! - `mutex`: a binary semaphore serializing index and storage updates,
//! - `free_slots`: counts empty slots, starts at `capacity`,
//! - `filled_slots`: counts stored items, starts at zero.
//!
//! Both operations wait on their counting semaphore first and take the mutex
//! second. Taking the mutex first would let a caller sleep on a full or empty
//! queue while holding it, and nobody could ever make progress again.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use turnstile::BoundedQueue;
//!
//! let queue = Arc::new(BoundedQueue::new(1).unwrap());
//! let producer = {
//!     let queue = Arc::clone(&queue);
//!     std::thread::spawn(move || (0..3).for_each(|i| queue.put(i)))
//! };
//! let got: Vec<i32> = (0..3).map(|_| queue.get()).collect();
//! producer.join().unwrap();
//! assert_eq!(got, vec![0, 1, 2]);
//! ```

use super::guarded::SemaphoreMutex;
use super::semaphore::Semaphore;
use crate::error::{ConfigError, Result};

/// A fixed-capacity FIFO queue shared by producer and consumer threads.
#[derive(Debug)]
pub struct BoundedQueue<T> {
    ring: SemaphoreMutex<Ring<T>>,
    free_slots: Semaphore,
    filled_slots: Semaphore,
    capacity: usize,
}

#[derive(Debug)]
struct Ring<T> {
    slots: Box<[Option<T>]>,
    head: usize,
    tail: usize,
    len: usize,
}

impl<T> Ring<T> {
    fn push(&mut self, item: T) {
        let capacity = self.slots.len();
        let slot = &mut self.slots[self.tail];
        assert!(slot.is_none(), "free slot {} already holds an item", self.tail);
        *slot = Some(item);
        self.tail = (self.tail + 1) % capacity;
        self.len += 1;
    }

    fn pop(&mut self) -> T {
        let capacity = self.slots.len();
        let Some(item) = self.slots[self.head].take() else {
            unreachable!("filled slot {} is empty", self.head);
        };
        self.head = (self.head + 1) % capacity;
        self.len -= 1;
        item
    }
}

impl<T> BoundedQueue<T> {
    /// Creates an empty queue with room for `capacity` items.
    ///
    /// A capacity of zero is rejected: such a queue could never accept an
    /// item, and every `put` would block forever.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(ConfigError::InvalidCapacity { capacity });
        }
        let slots = std::iter::repeat_with(|| None).take(capacity).collect();
        Ok(Self {
            ring: SemaphoreMutex::new(Ring {
                slots,
                head: 0,
                tail: 0,
                len: 0,
            }),
            free_slots: Semaphore::new(capacity),
            filled_slots: Semaphore::new(0),
            capacity,
        })
    }

    /// Returns the fixed number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of items stored right now.
    ///
    /// Briefly takes the queue mutex; the value may be stale on return.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.lock().len
    }

    /// Returns `true` if no items are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if every slot is filled.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity
    }

    /// Appends `item`, blocking while the queue is full.
    ///
    /// Wakes one blocked consumer, if any.
    pub fn put(&self, item: T) {
        self.free_slots.wait();
        self.store(item);
    }

    /// Appends `item` if a slot is free, handing it back otherwise.
    pub fn try_put(&self, item: T) -> std::result::Result<(), T> {
        if !self.free_slots.try_wait() {
            return Err(item);
        }
        self.store(item);
        Ok(())
    }

    /// Removes the oldest item, blocking while the queue is empty.
    ///
    /// Wakes one blocked producer, if any.
    pub fn get(&self) -> T {
        self.filled_slots.wait();
        self.take()
    }

    /// Removes the oldest item if there is one.
    pub fn try_get(&self) -> Option<T> {
        self.filled_slots.try_wait().then(|| self.take())
    }

    /// Writes into the slot reserved by a successful wait on `free_slots`.
    fn store(&self, item: T) {
        {
            let mut ring = self.ring.lock();
            ring.push(item);
            tracing::trace!(len = ring.len, tail = ring.tail, "queue::put");
        }
        self.filled_slots.signal();
    }

    /// Reads from the slot reserved by a successful wait on `filled_slots`.
    fn take(&self) -> T {
        let item = {
            let mut ring = self.ring.lock();
            let item = ring.pop();
            tracing::trace!(len = ring.len, head = ring.head, "queue::get");
            item
        };
        self.free_slots.signal();
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{init_test_logging, spin_until};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn init_test(name: &str) {
        init_test_logging();
        crate::test_phase!(name);
    }

    #[test]
    fn zero_capacity_rejected() {
        init_test("zero_capacity_rejected");
        let err = BoundedQueue::<u8>::new(0).expect_err("zero capacity accepted");
        crate::assert_with_log!(
            err == ConfigError::InvalidCapacity { capacity: 0 },
            "capacity error",
            ConfigError::InvalidCapacity { capacity: 0 },
            err
        );
        crate::test_complete!("zero_capacity_rejected");
    }

    #[test]
    fn single_slot_preserves_order() {
        init_test("single_slot_preserves_order");
        let queue = Arc::new(BoundedQueue::new(1).expect("queue"));
        let producer = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || {
                for i in 0..3 {
                    queue.put(i);
                }
            })
        };

        let got: Vec<i32> = (0..3).map(|_| queue.get()).collect();
        producer.join().expect("producer panicked");
        crate::assert_with_log!(got == vec![0, 1, 2], "order", vec![0, 1, 2], got);
        crate::test_complete!("single_slot_preserves_order");
    }

    #[test]
    fn wraps_around_the_ring() {
        init_test("wraps_around_the_ring");
        let queue = BoundedQueue::new(3).expect("queue");
        for round in 0..4 {
            queue.put(round * 10);
            queue.put(round * 10 + 1);
            assert_eq!(queue.get(), round * 10);
            assert_eq!(queue.get(), round * 10 + 1);
        }
        assert!(queue.is_empty());
        crate::test_complete!("wraps_around_the_ring");
    }

    #[test]
    fn try_ops_respect_bounds() {
        init_test("try_ops_respect_bounds");
        let queue = BoundedQueue::new(2).expect("queue");
        assert_eq!(queue.try_get(), None);
        assert_eq!(queue.try_put('a'), Ok(()));
        assert_eq!(queue.try_put('b'), Ok(()));
        assert!(queue.is_full());
        assert_eq!(queue.try_put('c'), Err('c'));
        assert_eq!(queue.try_get(), Some('a'));
        assert_eq!(queue.len(), 1);
        crate::test_complete!("try_ops_respect_bounds");
    }

    #[test]
    fn put_blocks_when_full() {
        init_test("put_blocks_when_full");
        let queue = Arc::new(BoundedQueue::new(1).expect("queue"));
        queue.put(1);
        let stored = Arc::new(AtomicBool::new(false));

        let producer = {
            let (queue, stored) = (Arc::clone(&queue), Arc::clone(&stored));
            std::thread::spawn(move || {
                queue.put(2);
                stored.store(true, Ordering::SeqCst);
            })
        };

        spin_until(|| queue.free_slots.waiters() == 1);
        assert!(!stored.load(Ordering::SeqCst));
        assert_eq!(queue.get(), 1);
        producer.join().expect("producer panicked");
        assert!(stored.load(Ordering::SeqCst));
        assert_eq!(queue.get(), 2);
        crate::test_complete!("put_blocks_when_full");
    }

    #[test]
    fn get_blocks_when_empty() {
        init_test("get_blocks_when_empty");
        let queue = Arc::new(BoundedQueue::new(4).expect("queue"));
        let consumer = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || queue.get())
        };
        spin_until(|| queue.filled_slots.waiters() == 1);
        queue.put("late");
        let got = consumer.join().expect("consumer panicked");
        assert_eq!(got, "late");
        crate::test_complete!("get_blocks_when_empty");
    }

    #[test]
    fn many_producers_many_consumers_exactly_once() {
        init_test("many_producers_many_consumers_exactly_once");
        const PRODUCERS: usize = 6;
        const CONSUMERS: usize = 4;
        const PER_PRODUCER: usize = 300;
        let queue = Arc::new(BoundedQueue::new(5).expect("queue"));

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        queue.put(p * 1000 + i);
                    }
                })
            })
            .collect();
        let consumers: Vec<_> = (0..CONSUMERS)
            .map(|_| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || {
                    (0..PRODUCERS * PER_PRODUCER / CONSUMERS)
                        .map(|_| queue.get())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        for producer in producers {
            producer.join().expect("producer panicked");
        }
        let mut seen = HashSet::new();
        for consumer in consumers {
            for item in consumer.join().expect("consumer panicked") {
                assert!(seen.insert(item), "item {item} delivered twice");
            }
        }

        crate::assert_with_log!(
            seen.len() == PRODUCERS * PER_PRODUCER,
            "distinct items",
            PRODUCERS * PER_PRODUCER,
            seen.len()
        );
        assert!(queue.is_empty());
        assert_eq!(queue.free_slots.available_permits(), queue.capacity());
        assert_eq!(queue.filled_slots.available_permits(), 0);
        crate::test_complete!("many_producers_many_consumers_exactly_once");
    }
}
