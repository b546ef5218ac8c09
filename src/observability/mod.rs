//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!
//! Consumers:
//!     → container stdout, collected by the platform
//! ```
//!
//! # Design Decisions
//! - Structured fields (endpoint, master, attempt) on every retry line
//! - JSON format for log pipelines, pretty format for humans

pub mod logging;

pub use logging::init_logging;
