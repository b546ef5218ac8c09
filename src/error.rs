//! Top-level error type.

use thiserror::Error;

use crate::config::ConfigError;
use crate::discovery::{DiscoveryError, ProbeError};
use crate::lifecycle::{HandoffError, WriteError};
use crate::template::{MaterializeError, TemplateError};

/// Every failure that ends the bootstrap with a non-zero exit.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The bounded discovery budget ran out.
    #[error("no master discovered via sentinel {endpoint} after {attempts} attempts: {last_error}")]
    DiscoveryExhausted {
        endpoint: String,
        attempts: u32,
        last_error: DiscoveryError,
    },

    #[error(transparent)]
    MasterUnreachable(#[from] ProbeError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Materialize(#[from] MaterializeError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Handoff(#[from] HandoffError),
}

/// Result type for bootstrap operations.
pub type BootstrapResult<T> = Result<T, BootstrapError>;

impl BootstrapError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        1
    }
}
