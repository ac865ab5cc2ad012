//! Scenario configuration with environment overrides.
//!
//! # Configuration Precedence
//!
//! Settings are resolved in this order (highest priority first):
//!
//! 1. **Programmatic**: values set on [`HarnessConfig`] (CLI flags)
//! 2. **Environment variables**: values from `TURNSTILE_*` env vars
//! 3. **Defaults**: [`HarnessConfig::default()`]
//!
//! # Supported Environment Variables
//!
//! | Variable | Type | Maps to |
//! |----------|------|---------|
//! | `TURNSTILE_CAPACITY` | `usize` | `capacity` |
//! | `TURNSTILE_PRODUCERS` | `usize` | `producers` |
//! | `TURNSTILE_CONSUMERS` | `usize` | `consumers` |
//! | `TURNSTILE_ITEMS` | `usize` | `items_per_producer` |
//! | `TURNSTILE_PARTICIPANTS` | `usize` | `participants` |
//! | `TURNSTILE_ITERATIONS` | `usize` | `iterations` |
//! | `TURNSTILE_PHASES` | `usize` | `phases` |
//! | `TURNSTILE_MAX_DELAY_MS` | `u64` | `max_delay_ms` |
//! | `TURNSTILE_SEED` | `u64` | `seed` |

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Environment variable name for queue capacity.
pub const ENV_CAPACITY: &str = "TURNSTILE_CAPACITY";
/// Environment variable name for producer thread count.
pub const ENV_PRODUCERS: &str = "TURNSTILE_PRODUCERS";
/// Environment variable name for consumer thread count.
pub const ENV_CONSUMERS: &str = "TURNSTILE_CONSUMERS";
/// Environment variable name for items put by each producer.
pub const ENV_ITEMS: &str = "TURNSTILE_ITEMS";
/// Environment variable name for ring / rendezvous / barrier size.
pub const ENV_PARTICIPANTS: &str = "TURNSTILE_PARTICIPANTS";
/// Environment variable name for ring cycles per actor.
pub const ENV_ITERATIONS: &str = "TURNSTILE_ITERATIONS";
/// Environment variable name for barrier phases.
pub const ENV_PHASES: &str = "TURNSTILE_PHASES";
/// Environment variable name for the upper bound of random delays.
pub const ENV_MAX_DELAY_MS: &str = "TURNSTILE_MAX_DELAY_MS";
/// Environment variable name for the delay PRNG seed.
pub const ENV_SEED: &str = "TURNSTILE_SEED";

/// Knobs for the threaded scenarios in [`harness`](crate::harness).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Bounded queue capacity.
    pub capacity: usize,
    /// Producer threads in the queue scenario.
    pub producers: usize,
    /// Consumer threads in the queue scenario.
    pub consumers: usize,
    /// Items put by each producer.
    pub items_per_producer: usize,
    /// Actors in the ring, rendezvous and barrier scenarios.
    pub participants: usize,
    /// Think/eat cycles per ring actor.
    pub iterations: usize,
    /// Phases in the barrier scenario.
    pub phases: usize,
    /// Upper bound for each random delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Seed for the per-actor delay streams.
    pub seed: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            capacity: 20,
            producers: 50,
            consumers: 50,
            items_per_producer: 10,
            participants: 5,
            iterations: 5,
            phases: 2,
            max_delay_ms: 10,
            seed: 0x5EED_5EED,
        }
    }
}

impl HarnessConfig {
    /// Defaults with `TURNSTILE_*` overrides applied.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        apply_env_overrides(&mut config)?;
        Ok(config)
    }

    /// Total items that pass through the queue scenario.
    ///
    /// Fails if `producers * items_per_producer` does not fit in a `usize`.
    pub fn total_items(&self) -> Result<usize> {
        self.producers
            .checked_mul(self.items_per_producer)
            .ok_or_else(|| {
                invalid(
                    "items_per_producer",
                    "producers * items_per_producer overflows",
                )
            })
    }

    /// Rejects settings under which the producer-consumer scenario cannot
    /// run to completion.
    pub fn validate_queue(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(ConfigError::InvalidCapacity {
                capacity: self.capacity,
            });
        }
        if self.producers == 0 {
            return Err(invalid("producers", "at least one producer is required"));
        }
        if self.consumers == 0 {
            return Err(invalid("consumers", "at least one consumer is required"));
        }
        self.total_items().map(drop)
    }

    /// Rejects ring sizes too small for two resources per actor.
    pub fn validate_ring(&self) -> Result<()> {
        if self.participants < 2 {
            return Err(ConfigError::TooFewParticipants {
                participants: self.participants,
                minimum: 2,
            });
        }
        Ok(())
    }

    /// Rejects an empty rendezvous.
    pub fn validate_rendezvous(&self) -> Result<()> {
        if self.participants == 0 {
            return Err(ConfigError::TooFewParticipants {
                participants: 0,
                minimum: 1,
            });
        }
        Ok(())
    }

    /// Rejects an empty barrier or a run with no phases.
    pub fn validate_barrier(&self) -> Result<()> {
        self.validate_rendezvous()?;
        if self.phases == 0 {
            return Err(invalid("phases", "at least one barrier phase is required"));
        }
        Ok(())
    }

    /// Rejects settings under which any scenario cannot run to completion.
    pub fn validate(&self) -> Result<()> {
        self.validate_queue()?;
        self.validate_ring()?;
        self.validate_barrier()
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidSetting {
        field,
        reason: reason.to_string(),
    }
}

/// Apply environment variable overrides to a [`HarnessConfig`].
///
/// Only variables that are set in the environment are applied.
/// Returns an error if a variable is set but contains an unparseable value.
pub fn apply_env_overrides(config: &mut HarnessConfig) -> Result<()> {
    if let Some(val) = read_env(ENV_CAPACITY) {
        config.capacity = parse_usize(ENV_CAPACITY, &val)?;
    }
    if let Some(val) = read_env(ENV_PRODUCERS) {
        config.producers = parse_usize(ENV_PRODUCERS, &val)?;
    }
    if let Some(val) = read_env(ENV_CONSUMERS) {
        config.consumers = parse_usize(ENV_CONSUMERS, &val)?;
    }
    if let Some(val) = read_env(ENV_ITEMS) {
        config.items_per_producer = parse_usize(ENV_ITEMS, &val)?;
    }
    if let Some(val) = read_env(ENV_PARTICIPANTS) {
        config.participants = parse_usize(ENV_PARTICIPANTS, &val)?;
    }
    if let Some(val) = read_env(ENV_ITERATIONS) {
        config.iterations = parse_usize(ENV_ITERATIONS, &val)?;
    }
    if let Some(val) = read_env(ENV_PHASES) {
        config.phases = parse_usize(ENV_PHASES, &val)?;
    }
    if let Some(val) = read_env(ENV_MAX_DELAY_MS) {
        config.max_delay_ms = parse_u64(ENV_MAX_DELAY_MS, &val)?;
    }
    if let Some(val) = read_env(ENV_SEED) {
        config.seed = parse_u64(ENV_SEED, &val)?;
    }
    Ok(())
}

/// Read an environment variable, returning `None` if unset.
fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn parse_usize(var: &'static str, val: &str) -> Result<usize> {
    val.trim()
        .parse::<usize>()
        .map_err(|e| ConfigError::InvalidEnv {
            var,
            value: val.to_string(),
            reason: format!("expected unsigned integer ({e})"),
        })
}

fn parse_u64(var: &'static str, val: &str) -> Result<u64> {
    let trimmed = val.trim();
    let parsed = trimmed.strip_prefix("0x").map_or_else(
        || trimmed.parse::<u64>(),
        |hex| u64::from_str_radix(hex, 16),
    );
    parsed.map_err(|e| ConfigError::InvalidEnv {
        var,
        value: val.to_string(),
        reason: format!("expected u64 ({e})"),
    })
}
