//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (overlay environment variables)
//!     → validation.rs (semantic checks)
//!     → BootstrapConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults so the environment alone is enough
//! - Environment wins over the file: the orchestrator owns the final say

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::BootstrapConfig;
pub use schema::DefaultMasterConfig;
pub use schema::LogFormat;
pub use schema::NodeConfig;
pub use schema::RetryConfig;
pub use schema::SentinelConfig;
