//! Test utilities for turnstile.
//!
//! This module provides shared helpers for unit and integration tests:
//! - Consistent tracing-based logging initialization
//! - Phase/section macros for readable test output
//! - Spin helpers for waiting on another thread's progress
//! - A watchdog that turns a deadlock into a test failure
//!
//! # Example
//! ```
//! use turnstile::test_utils::init_test_logging;
//!
//! fn my_test() {
//!     init_test_logging();
//!     turnstile::test_phase!("my_test");
//!     // test code
//!     turnstile::test_complete!("my_test");
//! }
//! ```

use std::sync::mpsc;
use std::sync::Once;
use std::time::{Duration, Instant};
use tracing_subscriber::fmt::format::FmtSpan;

static INIT_LOGGING: Once = Once::new();

/// Default seed used by test helpers.
pub const DEFAULT_TEST_SEED: u64 = 0xDEAD_BEEF;

/// Upper bound for [`spin_until`] before a test is declared hung.
pub const SPIN_LIMIT: Duration = Duration::from_secs(30);

/// Initialize test logging with trace-level output.
///
/// Safe to call multiple times; only initializes once.
pub fn init_test_logging() {
    init_test_logging_with_level(tracing::Level::TRACE);
}

/// Initialize test logging with a custom level.
///
/// The first call wins; later calls are no-ops.
pub fn init_test_logging_with_level(level: tracing::Level) {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_test_writer()
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(false)
            .try_init();
    });
}

/// Acquire the global environment lock for tests that mutate env vars.
#[cfg(test)]
pub(crate) fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    ENV_LOCK
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Yield until `condition` holds.
///
/// Used to wait for another thread to reach a blocking point (for example
/// `Semaphore::waiters() == 1`) before asserting on it.
///
/// # Panics
///
/// Panics if the condition does not hold within [`SPIN_LIMIT`].
pub fn spin_until(mut condition: impl FnMut() -> bool) {
    let start = Instant::now();
    while !condition() {
        assert!(
            start.elapsed() < SPIN_LIMIT,
            "condition not reached within {SPIN_LIMIT:?}"
        );
        std::thread::yield_now();
    }
}

/// Run `f` on a fresh thread and fail if it does not finish within `limit`.
///
/// Blocking primitives have no timeouts of their own, so a deadlock would
/// otherwise hang the test binary. The hung thread is leaked.
///
/// # Panics
///
/// Panics if `f` panics or does not complete in time.
pub fn assert_completes_within<T, F>(limit: Duration, description: &str, f: F) -> T
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let handle = std::thread::spawn(move || {
        let value = f();
        let _ = tx.send(());
        value
    });

    match rx.recv_timeout(limit) {
        Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => {}
        Err(mpsc::RecvTimeoutError::Timeout) => {
            panic!("operation '{description}' did not complete within {limit:?}");
        }
    }

    let value = match handle.join() {
        Ok(value) => value,
        Err(payload) => std::panic::resume_unwind(payload),
    };
    tracing::debug!(
        description = %description,
        timeout_ms = limit.as_millis(),
        "operation completed within timeout"
    );
    value
}

/// Log a test phase transition with a visual separator.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(phase = %$name, "========================================");
        tracing::info!(phase = %$name, "TEST PHASE: {}", $name);
        tracing::info!(phase = %$name, "========================================");
    };
}

/// Log a section within a test phase.
#[macro_export]
macro_rules! test_section {
    ($name:expr) => {
        tracing::debug!(section = %$name, "--- {} ---", $name);
    };
}

/// Log test completion with summary.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(test = %$name, "test completed successfully: {}", $name);
    };
    ($name:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::info!(
            test = %$name,
            $($key = %$value,)*
            "test completed successfully: {}",
            $name
        );
    };
}

/// Log before assertions for context.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $msg:expr, $expected:expr, $actual:expr) => {
        tracing::debug!(
            expected = ?$expected,
            actual = ?$actual,
            "Asserting: {}",
            $msg
        );
        assert!($cond, "{}: expected {:?}, got {:?}", $msg, $expected, $actual);
    };
}
