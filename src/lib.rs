//! Redis Role Bootstrapper Library

pub mod config;
pub mod discovery;
pub mod error;
pub mod lifecycle;
pub mod node;
pub mod observability;
pub mod resilience;
pub mod resolver;
pub mod template;

pub use config::schema::BootstrapConfig;
pub use error::BootstrapError;
pub use resolver::Resolver;
