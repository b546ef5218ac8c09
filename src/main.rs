//! Redis Role Bootstrapper
//!
//! Container entrypoint for a Redis master/slave/sentinel deployment.
//!
//! # Architecture Overview
//!
//! ```text
//!   environment + optional TOML
//!            │
//!            ▼
//!     ┌─────────────┐     ┌──────────────────┐
//!     │   config    │────▶│     resolver     │◀──── sleeps (resilience)
//!     └─────────────┘     │  state machine   │
//!                         └───┬─────────┬────┘
//!                             │         │
//!              discovery ◀────┘         └────▶ template + lifecycle
//!        (sentinel query, PING)                 (write config, exec)
//!                                                       │
//!                                                       ▼
//!                                         redis-server / redis-sentinel
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use redis_bootstrap::config::{load_config, schema::ObservabilityConfig, BootstrapConfig};
use redis_bootstrap::discovery::{RespPing, SentinelCli};
use redis_bootstrap::observability::init_logging;
use redis_bootstrap::resilience::TokioSleeper;
use redis_bootstrap::{BootstrapError, Resolver};

#[derive(Parser)]
#[command(name = "redis-bootstrap")]
#[command(about = "Resolve this pod's Redis role, write its config and exec into it", long_about = None)]
struct Cli {
    /// Optional TOML config file. Environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Resolve and write config, then print the command instead of running it.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            init_logging(&ObservabilityConfig::default());
            tracing::error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.observability);

    tracing::info!("redis-bootstrap v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        sentinel = %config.sentinel.endpoint(),
        master_name = %config.sentinel.master_name,
        pod = %config.node.pod_name,
        cluster_node = config.node.cluster_node,
        default_master = %config.default_master.pod_name,
        "Configuration loaded"
    );

    match run(config, cli.dry_run).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Bootstrap failed");
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}

async fn run(config: BootstrapConfig, dry_run: bool) -> Result<(), BootstrapError> {
    let discovery = SentinelCli::from_config(&config);
    let prober = RespPing::new(Duration::from_secs(config.timeouts.probe_secs));

    let resolver = Resolver::new(config, discovery, prober, TokioSleeper);
    let launch = resolver.run().await?;

    if dry_run {
        println!("{}", launch);
        return Ok(());
    }

    Err(launch.exec().into())
}
