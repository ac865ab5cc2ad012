//! Deterministic pseudo-random delays.
//!
//! Scenario actors "think", "eat" and "work" for random spans of time. Each
//! actor gets its own xorshift64 stream derived from the scenario seed, so a
//! run can be replayed with the same delay pattern.

use std::time::Duration;

/// A deterministic pseudo-random number generator using xorshift64.
///
/// Not cryptographically secure.
#[derive(Debug, Clone)]
pub struct DetRng {
    state: u64,
}

impl DetRng {
    /// Creates a new PRNG with the given seed; zero is replaced with 1.
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    /// Derives an independent stream for actor `index` of a scenario seeded
    /// with `seed`.
    #[must_use]
    pub const fn for_actor(seed: u64, index: usize) -> Self {
        // splitmix64 finalizer spreads neighbouring indices apart.
        let mut z = seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        Self::new(z ^ (z >> 31))
    }

    /// Generates the next pseudo-random u64 value.
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Generates a value in `[0, bound)`.
    ///
    /// # Panics
    ///
    /// Panics if `bound` is zero.
    pub fn next_below(&mut self, bound: u64) -> u64 {
        assert!(bound > 0, "bound must be non-zero");
        self.next_u64() % bound
    }

    /// Generates a delay in `[0, max_ms]` milliseconds.
    pub fn delay_up_to(&mut self, max_ms: u64) -> Duration {
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(self.next_below(max_ms + 1))
    }
}
