//! Threaded scenario drivers.
//!
//! Each driver spawns one scoped thread per actor, runs the classical
//! workload over a primitive from [`sync`](crate::sync), joins every thread
//! and returns a report. Reports record what the actors observed, so callers
//! (the CLI and the integration tests) can check the pattern's invariant
//! after the fact.
//!
//! Delays come from per-actor [`DetRng`] streams derived from
//! [`HarnessConfig::seed`], capped at [`HarnessConfig::max_delay_ms`].

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::ScopedJoinHandle;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::HarnessConfig;
use crate::error::Result;
use crate::sync::{Barrier, BoundedQueue, Rendezvous, ResourceRing};
use crate::util::DetRng;

/// An item moved through the queue scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Event {
    /// Producer that created the event.
    pub producer: usize,
    /// Position in that producer's output, starting at zero.
    pub sequence: usize,
}

impl Event {
    /// Display identifier, `producer * 1000 + sequence`.
    #[must_use]
    pub fn id(&self) -> usize {
        self.producer * 1000 + self.sequence
    }
}

/// Outcome of [`run_producer_consumer`].
#[derive(Debug, Clone, Serialize)]
pub struct QueueReport {
    /// Queue capacity used.
    pub capacity: usize,
    /// Events put by all producers.
    pub produced: usize,
    /// Events taken by all consumers.
    pub consumed: usize,
    /// Events taken more than once.
    pub duplicates: usize,
    /// Events put but never taken.
    pub missing: usize,
    /// Largest queue length observed right after a put.
    pub peak_len: usize,
    /// Events per consumer, in the order each consumer took them.
    #[serde(skip)]
    pub per_consumer: Vec<Vec<Event>>,
    /// Wall-clock duration of the scenario.
    pub elapsed_ms: u128,
}

impl QueueReport {
    /// Every event was delivered exactly once and the bound was respected.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.produced == self.consumed
            && self.duplicates == 0
            && self.missing == 0
            && self.peak_len <= self.capacity
    }
}

/// Outcome of [`run_dining`].
#[derive(Debug, Clone, Serialize)]
pub struct RingReport {
    /// Ring size.
    pub participants: usize,
    /// Actor that acquired right before left.
    pub reversed_participant: usize,
    /// Cycles each actor was asked to complete.
    pub iterations: usize,
    /// Completed cycles per actor.
    pub meals: Vec<usize>,
    /// Wall-clock duration of the scenario.
    pub elapsed_ms: u128,
}

impl RingReport {
    /// Total completed cycles across all actors.
    #[must_use]
    pub fn total_meals(&self) -> usize {
        self.meals.iter().sum()
    }

    /// Every actor completed every cycle.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.meals.len() == self.participants && self.meals.iter().all(|&m| m == self.iterations)
    }
}

/// Outcome of [`run_rendezvous`].
#[derive(Debug, Clone, Serialize)]
pub struct RendezvousReport {
    /// Number of participants.
    pub participants: usize,
    /// Global sequence number of the last "part A" record.
    pub last_part_a: usize,
    /// Global sequence number of the first "part B" record.
    pub first_part_b: usize,
    /// Participants whose arrival opened the gate.
    pub triggers: usize,
    /// Wall-clock duration of the scenario.
    pub elapsed_ms: u128,
}

impl RendezvousReport {
    /// Every part A happened before any part B, and the gate opened once.
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        self.last_part_a < self.first_part_b && self.triggers == 1
    }
}

/// Outcome of [`run_phased_barrier`].
#[derive(Debug, Clone, Serialize)]
pub struct BarrierReport {
    /// Number of participants.
    pub participants: usize,
    /// Leaders observed in each generation.
    pub leaders_per_generation: Vec<usize>,
    /// Times a participant left a phase before all had arrived.
    pub early_departures: usize,
    /// Generations completed by the barrier.
    pub generations: u64,
    /// Wall-clock duration of the scenario.
    pub elapsed_ms: u128,
}

impl BarrierReport {
    /// Each generation had one leader and nobody left early.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.early_departures == 0 && self.leaders_per_generation.iter().all(|&n| n == 1)
    }
}

fn join<T>(handle: ScopedJoinHandle<'_, T>) -> T {
    handle
        .join()
        .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
}

fn pause(rng: &mut DetRng, max_ms: u64) {
    let delay = rng.delay_up_to(max_ms);
    if delay > Duration::ZERO {
        std::thread::sleep(delay);
    }
}

/// Runs P producers and Q consumers over one [`BoundedQueue`].
///
/// Every producer puts `items_per_producer` events; consumers split the total
/// between them, the first `total % Q` consumers taking one extra.
pub fn run_producer_consumer(config: &HarnessConfig) -> Result<QueueReport> {
    config.validate_queue()?;
    let queue = BoundedQueue::new(config.capacity)?;
    let total = config.total_items()?;
    let peak = AtomicUsize::new(0);
    let start = Instant::now();
    tracing::info!(
        capacity = config.capacity,
        producers = config.producers,
        consumers = config.consumers,
        total,
        "producer-consumer starting"
    );

    let per_consumer = std::thread::scope(|s| {
        let producers: Vec<_> = (0..config.producers)
            .map(|producer| {
                let (queue, peak) = (&queue, &peak);
                s.spawn(move || {
                    let mut rng = DetRng::for_actor(config.seed, producer);
                    for sequence in 0..config.items_per_producer {
                        pause(&mut rng, config.max_delay_ms);
                        let event = Event { producer, sequence };
                        queue.put(event);
                        peak.fetch_max(queue.len(), Ordering::Relaxed);
                        tracing::info!(producer, event = event.id(), "produced event");
                    }
                })
            })
            .collect();

        let consumers: Vec<_> = (0..config.consumers)
            .map(|consumer| {
                let queue = &queue;
                let quota = total / config.consumers
                    + usize::from(consumer < total % config.consumers);
                s.spawn(move || {
                    let mut rng = DetRng::for_actor(config.seed, config.producers + consumer);
                    (0..quota)
                        .map(|_| {
                            let event = queue.get();
                            tracing::info!(consumer, event = event.id(), "consuming event");
                            pause(&mut rng, config.max_delay_ms);
                            event
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        producers.into_iter().for_each(join);
        consumers.into_iter().map(join).collect::<Vec<_>>()
    });

    let mut seen = HashSet::with_capacity(total);
    let mut duplicates = 0;
    for event in per_consumer.iter().flatten() {
        if !seen.insert(*event) {
            duplicates += 1;
        }
    }
    let consumed = per_consumer.iter().map(Vec::len).sum();
    let report = QueueReport {
        capacity: config.capacity,
        produced: total,
        consumed,
        duplicates,
        missing: total - seen.len(),
        peak_len: peak.into_inner(),
        per_consumer,
        elapsed_ms: start.elapsed().as_millis(),
    };
    tracing::info!(
        consumed = report.consumed,
        peak_len = report.peak_len,
        "all producers and consumers finished"
    );
    Ok(report)
}

/// Runs N actors around a [`ResourceRing`] for `iterations` think/eat cycles.
pub fn run_dining(config: &HarnessConfig) -> Result<RingReport> {
    config.validate_ring()?;
    let ring = ResourceRing::new(config.participants)?;
    let start = Instant::now();
    tracing::info!(
        participants = config.participants,
        reversed = ring.reversed_participant(),
        iterations = config.iterations,
        "dining starting, deadlock prevented by reversed acquisition order"
    );

    let meals = std::thread::scope(|s| {
        let actors: Vec<_> = (0..config.participants)
            .map(|actor| {
                let ring = &ring;
                s.spawn(move || {
                    let mut rng = DetRng::for_actor(config.seed, actor);
                    let mut meals = 0;
                    for _ in 0..config.iterations {
                        pause(&mut rng, config.max_delay_ms);
                        tracing::info!(actor, "was thinking");
                        let pair = ring.hold(actor);
                        pause(&mut rng, config.max_delay_ms);
                        tracing::info!(actor, "was eating");
                        drop(pair);
                        meals += 1;
                    }
                    tracing::info!(actor, meals, "has finished dining");
                    meals
                })
            })
            .collect();
        actors.into_iter().map(join).collect::<Vec<_>>()
    });

    Ok(RingReport {
        participants: config.participants,
        reversed_participant: ring.reversed_participant(),
        iterations: config.iterations,
        meals,
        elapsed_ms: start.elapsed().as_millis(),
    })
}

/// Runs N actors through a single [`Rendezvous`].
///
/// Each actor sleeps, records "part A", arrives, then records "part B".
/// Records draw from one global sequence so the report can check that all
/// part A records precede all part B records.
pub fn run_rendezvous(config: &HarnessConfig) -> Result<RendezvousReport> {
    config.validate_rendezvous()?;
    let rendezvous = Rendezvous::new(config.participants)?;
    let sequence = AtomicUsize::new(0);
    let start = Instant::now();

    let marks = std::thread::scope(|s| {
        let actors: Vec<_> = (0..config.participants)
            .map(|actor| {
                let (rendezvous, sequence) = (&rendezvous, &sequence);
                s.spawn(move || {
                    let mut rng = DetRng::for_actor(config.seed, actor);
                    pause(&mut rng, config.max_delay_ms);
                    let part_a = sequence.fetch_add(1, Ordering::SeqCst);
                    tracing::info!(actor, "part A");
                    let arrival = rendezvous.arrive();
                    let part_b = sequence.fetch_add(1, Ordering::SeqCst);
                    tracing::info!(actor, order = arrival.order(), "part B");
                    (part_a, part_b, arrival.triggered_release())
                })
            })
            .collect();
        actors.into_iter().map(join).collect::<Vec<_>>()
    });

    Ok(RendezvousReport {
        participants: config.participants,
        last_part_a: marks.iter().map(|m| m.0).max().unwrap_or(0),
        first_part_b: marks.iter().map(|m| m.1).min().unwrap_or(0),
        triggers: marks.iter().filter(|m| m.2).count(),
        elapsed_ms: start.elapsed().as_millis(),
    })
}

/// Runs N actors through `phases` rounds of one reusable [`Barrier`].
pub fn run_phased_barrier(config: &HarnessConfig) -> Result<BarrierReport> {
    config.validate_barrier()?;
    let barrier = Barrier::new(config.participants)?;
    let arrivals: Vec<AtomicUsize> = (0..config.phases).map(|_| AtomicUsize::new(0)).collect();
    let leaders: Vec<AtomicUsize> = (0..config.phases).map(|_| AtomicUsize::new(0)).collect();
    let early = AtomicUsize::new(0);
    let start = Instant::now();

    std::thread::scope(|s| {
        let actors: Vec<_> = (0..config.participants)
            .map(|actor| {
                let (barrier, arrivals, leaders, early) = (&barrier, &arrivals, &leaders, &early);
                s.spawn(move || {
                    let mut rng = DetRng::for_actor(config.seed, actor);
                    for phase in 0..config.phases {
                        pause(&mut rng, config.max_delay_ms);
                        tracing::info!(actor, phase, "phase work done");
                        arrivals[phase].fetch_add(1, Ordering::SeqCst);
                        let result = barrier.wait();
                        if arrivals[phase].load(Ordering::SeqCst) != config.participants {
                            early.fetch_add(1, Ordering::SeqCst);
                        }
                        if result.is_leader() {
                            leaders[phase].fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();
        actors.into_iter().for_each(join);
    });

    Ok(BarrierReport {
        participants: config.participants,
        leaders_per_generation: leaders.into_iter().map(AtomicUsize::into_inner).collect(),
        early_departures: early.into_inner(),
        generations: barrier.generation(),
        elapsed_ms: start.elapsed().as_millis(),
    })
}
