//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ports non-zero, attempts > 0)
//! - Require the identity inputs the resolver cannot run without
//!
//! Returns every error found, not just the first.

use crate::config::schema::BootstrapConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check `config`, collecting all violations.
pub fn validate_config(config: &BootstrapConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut check = |ok: bool, field: &'static str, message: &str| {
        if !ok {
            errors.push(ValidationError { field, message: message.to_string() });
        }
    };

    check(!config.node.pod_name.trim().is_empty(), "node.pod_name", "must be set (POD_NAME or HOSTNAME)");
    check(!config.sentinel.host.trim().is_empty(), "sentinel.host", "must not be empty");
    check(config.sentinel.port != 0, "sentinel.port", "must be non-zero");
    check(!config.sentinel.master_name.trim().is_empty(), "sentinel.master_name", "must not be empty");
    check(!config.default_master.pod_name.trim().is_empty(), "default_master.pod_name", "must not be empty");
    check(config.default_master.port != 0, "default_master.port", "must be non-zero");
    check(config.timeouts.discovery_secs > 0, "timeouts.discovery_secs", "must be greater than zero");
    check(config.timeouts.probe_secs > 0, "timeouts.probe_secs", "must be greater than zero");
    check(
        config.retries.max_discovery_attempts > 0,
        "retries.max_discovery_attempts",
        "must be greater than zero",
    );
    check(
        config.retries.master_check_attempts > 0,
        "retries.master_check_attempts",
        "must be greater than zero",
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
