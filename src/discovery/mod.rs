//! Master discovery subsystem.
//!
//! # Data Flow
//! ```text
//! client.rs:  redis-cli --csv SENTINEL get-master-addr-by-name <name>
//!                 → "host","port" → MasterLocation
//! probe.rs:   MasterLocation → TCP PING → reachable / ProbeError
//! ```
//!
//! Both sides are traits so the resolver can be driven by fakes.

pub mod client;
pub mod probe;

pub use client::{parse_master_reply, Discovery, DiscoveryError, SentinelCli};
pub use probe::{ProbeError, Prober, RespPing};
