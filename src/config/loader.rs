//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;
use crate::config::schema::{BootstrapConfig, LogFormat};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env { var: &'static str, value: String, reason: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { var, value, reason } => {
                write!(f, "Invalid value {:?} for {}: {}", value, var, reason)
            }
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration from an optional TOML file, overlay the process
/// environment, and validate the result.
pub fn load_config(path: Option<&Path>) -> Result<BootstrapConfig, ConfigError> {
    load_config_with(path, |name| std::env::var(name).ok())
}

/// Same as [`load_config`] with an explicit environment lookup.
pub fn load_config_with<F>(path: Option<&Path>, lookup: F) -> Result<BootstrapConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(ConfigError::Parse)?
        }
        None => BootstrapConfig::default(),
    };

    apply_env(&mut config, lookup)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables onto `config`. Unset or empty variables
/// leave the existing value alone.
pub fn apply_env<F>(config: &mut BootstrapConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("REDIS_SENTINEL_SERVICE_HOST") {
        config.sentinel.host = v;
    }
    if let Some(v) = get("REDIS_SENTINEL_SERVICE_PORT") {
        config.sentinel.port = parse_port("REDIS_SENTINEL_SERVICE_PORT", v)?;
    }
    if let Some(v) = get("REDIS_MASTER_NAME") {
        config.sentinel.master_name = v;
    }
    if let Some(v) = get("REDIS_CLUSTER_NODE") {
        config.node.cluster_node = parse_bool("REDIS_CLUSTER_NODE", v)?;
    }
    if let Some(v) = get("POD_NAME").or_else(|| get("HOSTNAME")) {
        config.node.pod_name = v;
    }
    if let Some(v) = get("POD_IP") {
        config.node.pod_ip = Some(v);
    }
    if let Some(v) = get("REDIS_SERVICE_NAME") {
        config.node.service_name = Some(v);
    }
    if let Some(v) = get("REDIS_DEFAULT_MASTER") {
        config.default_master.pod_name = v;
    }
    if let Some(v) = get("REDIS_DEFAULT_MASTER_HOST") {
        config.default_master.host = Some(v);
    }
    if let Some(v) = get("REDIS_DEFAULT_MASTER_PORT") {
        config.default_master.port = parse_port("REDIS_DEFAULT_MASTER_PORT", v)?;
    }
    if let Some(v) = get("REDIS_BOOTSTRAP_LOG") {
        config.observability.log_filter = v;
    }
    if let Some(v) = get("REDIS_BOOTSTRAP_LOG_FORMAT") {
        config.observability.log_format = match v.trim().to_ascii_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            "json" => LogFormat::Json,
            _ => {
                return Err(ConfigError::Env {
                    var: "REDIS_BOOTSTRAP_LOG_FORMAT",
                    value: v,
                    reason: "expected \"pretty\" or \"json\"".to_string(),
                })
            }
        };
    }

    Ok(())
}

fn parse_port(var: &'static str, value: String) -> Result<u16, ConfigError> {
    value.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Env {
        var,
        value,
        reason: e.to_string(),
    })
}

fn parse_bool(var: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Env {
            var,
            value,
            reason: "expected true or false".to_string(),
        }),
    }
}
