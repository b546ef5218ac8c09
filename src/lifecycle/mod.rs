//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Create data dir → Write resolved config (temp file + rename)
//!
//! Handoff (handoff.rs):
//!     Launch → exec redis-server / redis-sentinel (never returns on success)
//! ```
//!
//! # Design Decisions
//! - Config is written exactly once, immediately before handoff
//! - No cleanup on signal: the target file is either absent or complete

pub mod handoff;
pub mod startup;

pub use handoff::{HandoffError, Launch};
pub use startup::{ensure_data_dir, write_config, WriteError};
