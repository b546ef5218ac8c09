//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the bootstrapper.
//! All types derive Serde traits for deserialization from config files, and every
//! field has a default so an empty file (or no file at all) is a valid config.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the bootstrapper.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Sentinel endpoint used to discover the current master.
    pub sentinel: SentinelConfig,

    /// This pod's place in the deployment.
    pub node: NodeConfig,

    /// Statically configured master used when sentinels cannot answer.
    pub default_master: DefaultMasterConfig,

    /// Template, output and data paths.
    pub paths: PathsConfig,

    /// Binaries invoked during discovery and handoff.
    pub binaries: BinariesConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Sentinel (discovery endpoint) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SentinelConfig {
    /// Sentinel service host.
    pub host: String,

    /// Sentinel service port.
    pub port: u16,

    /// Name of the monitored master set.
    pub master_name: String,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            host: "redis-sentinel".to_string(),
            port: 26379,
            master_name: "mymaster".to_string(),
        }
    }
}

impl SentinelConfig {
    /// `host:port` form used in log lines.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Node identity inputs.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct NodeConfig {
    /// True for redis-server pods, false for sentinels.
    pub cluster_node: bool,

    /// Name of this pod.
    pub pod_name: String,

    /// Address of this pod, if the platform exposes it.
    pub pod_ip: Option<String>,

    /// Headless service name the pods are registered under.
    pub service_name: Option<String>,
}

/// The designated default master.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DefaultMasterConfig {
    /// Pod name of the designated default master.
    pub pod_name: String,

    /// Explicit host to use when sentinels are unreachable.
    /// Takes precedence over the `<pod>.<service>` form.
    pub host: Option<String>,

    /// Port the master listens on.
    pub port: u16,
}

impl Default for DefaultMasterConfig {
    fn default() -> Self {
        Self {
            pod_name: "redis-0".to_string(),
            host: None,
            port: 6379,
        }
    }
}

/// Filesystem locations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Mounted redis-server template (optional at runtime).
    pub server_template: PathBuf,

    /// Mounted sentinel template (optional at runtime).
    pub sentinel_template: PathBuf,

    /// Resolved redis-server config written here.
    pub server_config: PathBuf,

    /// Resolved sentinel config written here.
    pub sentinel_config: PathBuf,

    /// Redis data directory, created if missing.
    pub data_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            server_template: PathBuf::from("/redis-config/redis.conf"),
            sentinel_template: PathBuf::from("/redis-config/sentinel.conf"),
            server_config: PathBuf::from("/redis-master/redis.conf"),
            sentinel_config: PathBuf::from("/redis-sentinel/sentinel.conf"),
            data_dir: PathBuf::from("/redis-master-data"),
        }
    }
}

/// External binaries.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BinariesConfig {
    pub redis_cli: String,
    pub redis_server: String,
    pub redis_sentinel: String,
}

impl Default for BinariesConfig {
    fn default() -> Self {
        Self {
            redis_cli: "redis-cli".to_string(),
            redis_server: "redis-server".to_string(),
            redis_sentinel: "redis-sentinel".to_string(),
        }
    }
}

/// Timeout configuration for external calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for a single sentinel query in seconds.
    pub discovery_secs: u64,

    /// Deadline for a single master liveness probe in seconds.
    pub probe_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            discovery_secs: 10,
            probe_secs: 5,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Spacing between discovery attempts and probes in seconds.
    pub interval_secs: u64,

    /// Discovery attempts before the slave path gives up.
    pub max_discovery_attempts: u32,

    /// Delay before exiting once discovery attempts are exhausted, in seconds.
    pub grace_secs: u64,

    /// Queries the default master makes before claiming the master role.
    pub master_check_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            interval_secs: 10,
            max_discovery_attempts: 3,
            grace_secs: 30,
            master_check_attempts: 2,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Filter directive (e.g. "redis_bootstrap=debug").
    pub log_filter: String,

    /// Output format.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "redis_bootstrap=info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}
