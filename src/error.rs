//! Error types for turnstile.
//!
//! Only construction can fail. Once a primitive exists, its operations either
//! complete or block until their precondition holds; there is no partial
//! completion and nothing to retry.
//!
//! # Error Categories
//!
//! - **Configuration**: a capacity, participant count, permit count or
//!   reversed-participant index that cannot describe a working primitive.
//!   Reported immediately, never clamped.
//! - **Environment**: a `TURNSTILE_*` variable that does not parse.
//!
//! Contract violations (releasing a resource that was never acquired, arriving
//! at a rendezvous more times than it has participants) are not errors: they
//! indicate a bug in the caller and panic with a descriptive message.

use thiserror::Error;

/// Errors reported when a primitive or scenario is configured.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A bounded queue was requested with no slots.
    #[error("queue capacity must be positive, got {capacity}")]
    InvalidCapacity {
        /// Requested capacity.
        capacity: usize,
    },

    /// Fewer participants than the pattern can work with.
    #[error("{participants} participant(s) requested, at least {minimum} required")]
    TooFewParticipants {
        /// Requested participant count.
        participants: usize,
        /// Smallest count the pattern supports.
        minimum: usize,
    },

    /// A semaphore was requested with a negative initial count.
    #[error("semaphore initial permits must be non-negative, got {permits}")]
    NegativePermits {
        /// Requested initial count.
        permits: i64,
    },

    /// The reversed-order participant does not sit at the ring.
    #[error("reversed participant {index} is outside a ring of {participants}")]
    ReversedIndexOutOfRange {
        /// Requested reversed participant index.
        index: usize,
        /// Ring size.
        participants: usize,
    },

    /// A scenario knob would make the scenario meaningless.
    #[error("invalid {field}: {reason}")]
    InvalidSetting {
        /// Name of the offending setting.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// An environment override could not be parsed.
    #[error("invalid value for {var}: {reason} (got {value:?})")]
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// Raw value as read from the environment.
        value: String,
        /// Parse failure description.
        reason: String,
    },
}

/// A specialized `Result` type for turnstile construction.
pub type Result<T> = std::result::Result<T, ConfigError>;
