//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Sentinel query / master probe:
//!     → discovery (enforce per-call timeout)
//!     → On failure: retries.rs (log, sleep, try again per policy)
//!     → Bounded policy exhausted: fatal, surfaced as exit code 1
//! ```

pub mod retries;

pub use retries::{retry, RetryExhausted, RetryPolicy, Sleeper, TokioSleeper};
