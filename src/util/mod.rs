//! Small utilities shared by the scenario harness and tests.

pub mod det_rng;

pub use det_rng::DetRng;
