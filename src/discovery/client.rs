//! Sentinel discovery client.
//!
//! # Responsibilities
//! - Ask the sentinel service which address currently serves the master set
//! - Enforce a deadline on every query
//! - Turn the CSV reply into a [`MasterLocation`]

use std::future::Future;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;

use crate::config::{BootstrapConfig, SentinelConfig};
use crate::node::MasterLocation;

/// Errors that can occur while querying the sentinel service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    /// Could not reach the sentinel, or the query timed out or exited non-zero.
    #[error("sentinel {endpoint} unreachable: {reason}")]
    Unreachable { endpoint: String, reason: String },

    /// The sentinel answered but the reply has no usable host/port.
    #[error("sentinel {endpoint} returned malformed reply {reply:?}: {reason}")]
    Malformed { endpoint: String, reply: String, reason: &'static str },
}

/// Anything that can tell us where the master is.
pub trait Discovery {
    fn query_master(&self) -> impl Future<Output = Result<MasterLocation, DiscoveryError>>;

    /// Endpoint description for log lines.
    fn endpoint(&self) -> String;
}

/// Queries sentinel through `redis-cli --csv SENTINEL get-master-addr-by-name`.
#[derive(Debug, Clone)]
pub struct SentinelCli {
    redis_cli: String,
    sentinel: SentinelConfig,
    timeout: Duration,
}

impl SentinelCli {
    pub fn new(redis_cli: impl Into<String>, sentinel: SentinelConfig, timeout: Duration) -> Self {
        Self {
            redis_cli: redis_cli.into(),
            sentinel,
            timeout,
        }
    }

    pub fn from_config(config: &BootstrapConfig) -> Self {
        Self::new(
            config.binaries.redis_cli.clone(),
            config.sentinel.clone(),
            Duration::from_secs(config.timeouts.discovery_secs),
        )
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.redis_cli);
        cmd.arg("-h")
            .arg(&self.sentinel.host)
            .arg("-p")
            .arg(self.sentinel.port.to_string())
            .arg("--csv")
            .arg("SENTINEL")
            .arg("get-master-addr-by-name")
            .arg(&self.sentinel.master_name)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

impl Discovery for SentinelCli {
    async fn query_master(&self) -> Result<MasterLocation, DiscoveryError> {
        let endpoint = self.endpoint();
        let unreachable = |reason: String| DiscoveryError::Unreachable {
            endpoint: endpoint.clone(),
            reason,
        };

        tracing::debug!(
            endpoint = %endpoint,
            master_name = %self.sentinel.master_name,
            "Querying sentinel for master address"
        );

        let output = match timeout(self.timeout, self.command().output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(unreachable(format!("failed to run {}: {}", self.redis_cli, e))),
            Err(_) => {
                return Err(unreachable(format!("timed out after {}s", self.timeout.as_secs())))
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(unreachable(format!("{} ({})", output.status, stderr.trim())));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        // redis-cli reports connection errors on stdout with exit status 0
        // in some versions.
        if stdout.starts_with("Could not connect") {
            return Err(unreachable(stdout.trim().to_string()));
        }

        let location = parse_master_reply(&stdout)
            .map_err(|reason| DiscoveryError::Malformed {
                endpoint: endpoint.clone(),
                reply: stdout.trim().to_string(),
                reason,
            })?;

        tracing::info!(endpoint = %endpoint, master = %location, "Sentinel reported master");
        Ok(location)
    }

    fn endpoint(&self) -> String {
        self.sentinel.endpoint()
    }
}

/// Parse the first line of a `--csv` reply: `"host","port"`.
///
/// Quotes and surrounding whitespace are stripped. Sentinel answers `NIL`
/// when it does not know the master set; that and any reply without both
/// fields is rejected.
pub fn parse_master_reply(reply: &str) -> Result<MasterLocation, &'static str> {
    let line = reply.lines().next().unwrap_or("").trim();
    if line.is_empty() || line.eq_ignore_ascii_case("NIL") {
        return Err("no master known");
    }

    let mut fields = line.split(',').map(|f| f.trim().trim_matches('"').trim());
    let host = fields.next().filter(|h| !h.is_empty()).ok_or("missing host")?;
    let port = fields.next().filter(|p| !p.is_empty()).ok_or("missing port")?;
    if fields.next().is_some() {
        return Err("unexpected extra fields");
    }
    let port: u16 = port.parse().map_err(|_| "port is not a number")?;
    if port == 0 {
        return Err("port must be non-zero");
    }

    Ok(MasterLocation::new(host, port))
}
