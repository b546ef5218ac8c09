//! Role resolution state machine.
//!
//! # States
//! ```text
//! Init → DeterminingRole → MasterPath ──┬──────────────→ Ready(Launch)
//!                        │              └→ SlavePath ──┬→ Ready(Launch)
//!                        ├→ SlavePath ─────────────────┤
//!                        │                             └→ Failed
//!                        └→ SentinelPath ─────────────→ Ready(Launch)
//! ```
//!
//! # Transition Rules
//! - Not a cluster node: SentinelPath.
//! - Cluster node, default master: MasterPath. The path first asks sentinel
//!   whether a master already exists; if it is another pod, this pod demotes
//!   itself to SlavePath instead of competing with it.
//! - Cluster node, anything else: SlavePath.
//!
//! # Retry Budgets
//! - SlavePath discovery is bounded. Exhaustion sleeps the grace period and
//!   fails.
//! - SlavePath liveness probing and SentinelPath resolution are unbounded.

use std::path::Path;
use std::time::Duration;

use crate::config::BootstrapConfig;
use crate::discovery::{Discovery, Prober};
use crate::error::{BootstrapError, BootstrapResult};
use crate::lifecycle::{ensure_data_dir, write_config, Launch};
use crate::node::{fallback_master, MasterLocation, NodeIdentity, Role};
use crate::resilience::{retry, RetryPolicy, Sleeper};
use crate::template::{materialize, ConfigTemplate, Defaults, ResolvedConfig};

/// Resolver state.
#[derive(Debug)]
pub enum State {
    Init,
    DeterminingRole(NodeIdentity),
    MasterPath(NodeIdentity),
    SlavePath(NodeIdentity),
    SentinelPath(NodeIdentity),
    Ready(Launch),
    Failed(BootstrapError),
}

impl State {
    pub fn name(&self) -> &'static str {
        match self {
            State::Init => "init",
            State::DeterminingRole(_) => "determining-role",
            State::MasterPath(_) => "master-path",
            State::SlavePath(_) => "slave-path",
            State::SentinelPath(_) => "sentinel-path",
            State::Ready(_) => "ready",
            State::Failed(_) => "failed",
        }
    }

    fn finish(result: BootstrapResult<Launch>) -> Self {
        match result {
            Ok(launch) => State::Ready(launch),
            Err(e) => State::Failed(e),
        }
    }
}

/// Drives a node from start-up to a [`Launch`].
pub struct Resolver<D, P, S> {
    config: BootstrapConfig,
    discovery: D,
    prober: P,
    sleeper: S,
}

impl<D, P, S> Resolver<D, P, S>
where
    D: Discovery,
    P: Prober,
    S: Sleeper,
{
    pub fn new(config: BootstrapConfig, discovery: D, prober: P, sleeper: S) -> Self {
        Self {
            config,
            discovery,
            prober,
            sleeper,
        }
    }

    /// Run the state machine to a terminal state. Config files are written
    /// before this returns `Ok`; the caller performs the handoff.
    pub async fn run(&self) -> BootstrapResult<Launch> {
        let mut state = State::Init;
        loop {
            state = match state {
                State::Init => State::DeterminingRole(NodeIdentity::from_config(&self.config)),
                State::DeterminingRole(identity) => {
                    tracing::info!(
                        pod = %identity.pod_name,
                        role = %identity.role,
                        default_master = identity.is_default_master,
                        "Node identity"
                    );
                    match identity.role {
                        Role::Master => State::MasterPath(identity),
                        Role::Slave => State::SlavePath(identity),
                        Role::Sentinel => State::SentinelPath(identity),
                    }
                }
                State::MasterPath(identity) => self.master_path(identity).await,
                State::SlavePath(identity) => self.slave_path(identity).await,
                State::SentinelPath(identity) => self.sentinel_path(identity).await,
                State::Ready(launch) => return Ok(launch),
                State::Failed(e) => return Err(e),
            };
            tracing::debug!(state = state.name(), "Resolver transition");
        }
    }

    async fn master_path(&self, identity: NodeIdentity) -> State {
        let policy = RetryPolicy::master_check(&self.config.retries);
        let discovery = &self.discovery;

        match retry("existing master check", &policy, &self.sleeper, move |_| {
            discovery.query_master()
        })
        .await
        {
            Ok(existing) if !identity.is_self(&existing) => {
                tracing::warn!(
                    pod = %identity.pod_name,
                    master = %existing,
                    "Another master is already active, joining as slave"
                );
                State::SlavePath(identity)
            }
            Ok(existing) => {
                tracing::info!(master = %existing, "Sentinel already lists this pod as master");
                State::finish(self.launch_master())
            }
            Err(exhausted) => {
                tracing::info!(
                    attempts = exhausted.attempts,
                    "No existing master discovered, starting as master"
                );
                State::finish(self.launch_master())
            }
        }
    }

    async fn slave_path(&self, identity: NodeIdentity) -> State {
        let master = match self.discover_bounded().await {
            Ok(master) => master,
            Err(e) => return State::Failed(e),
        };

        // A failover promoted this pod before it restarted.
        if identity.is_self(&master) {
            tracing::warn!(master = %master, "Sentinel lists this pod as master, starting as master");
            return State::finish(self.launch_master());
        }

        if let Err(e) = self.wait_until_reachable(&master).await {
            return State::Failed(e);
        }

        State::finish(self.launch_slave(&master))
    }

    async fn sentinel_path(&self, _identity: NodeIdentity) -> State {
        let fallback = fallback_master(&self.config);
        let policy = RetryPolicy::forever(&self.config.retries);
        let (discovery, prober, fallback) = (&self.discovery, &self.prober, &fallback);

        let resolved = retry("sentinel master resolution", &policy, &self.sleeper, move |_| async move {
            let candidate = match discovery.query_master().await {
                Ok(master) => master,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        fallback = %fallback,
                        "Discovery failed, falling back to default master"
                    );
                    fallback.clone()
                }
            };
            prober.probe(&candidate).await.map(|()| candidate)
        })
        .await;

        match resolved {
            Ok(master) => State::finish(self.launch_sentinel(&master)),
            Err(exhausted) => State::Failed(exhausted.last_error.into()),
        }
    }

    /// Bounded discovery. On exhaustion waits out the grace period before
    /// reporting failure.
    async fn discover_bounded(&self) -> BootstrapResult<MasterLocation> {
        let policy = RetryPolicy::discovery(&self.config.retries);
        let discovery = &self.discovery;

        match retry("master discovery", &policy, &self.sleeper, move |_| discovery.query_master()).await {
            Ok(master) => Ok(master),
            Err(exhausted) => {
                let grace = Duration::from_secs(self.config.retries.grace_secs);
                tracing::error!(
                    endpoint = %self.discovery.endpoint(),
                    attempts = exhausted.attempts,
                    error = %exhausted.last_error,
                    grace_secs = grace.as_secs(),
                    "Failed to find master, exiting after grace period"
                );
                self.sleeper.sleep(grace).await;
                Err(BootstrapError::DiscoveryExhausted {
                    endpoint: self.discovery.endpoint(),
                    attempts: exhausted.attempts,
                    last_error: exhausted.last_error,
                })
            }
        }
    }

    async fn wait_until_reachable(&self, master: &MasterLocation) -> BootstrapResult<()> {
        let policy = RetryPolicy::forever(&self.config.retries);
        let prober = &self.prober;

        retry("master liveness probe", &policy, &self.sleeper, move |_| prober.probe(master))
            .await
            .map_err(|exhausted| exhausted.last_error.into())
    }

    fn launch_master(&self) -> BootstrapResult<Launch> {
        let template = ConfigTemplate::load(&self.config.paths.server_template)?;
        let resolved = materialize(template.as_ref(), None, Role::Master, &self.defaults())?;
        self.write_server(Role::Master, &resolved)
    }

    fn launch_slave(&self, master: &MasterLocation) -> BootstrapResult<Launch> {
        let template = ConfigTemplate::load(&self.config.paths.server_template)?;
        let resolved = materialize(template.as_ref(), Some(master), Role::Slave, &self.defaults())?;
        self.write_server(Role::Slave, &resolved)
    }

    fn launch_sentinel(&self, master: &MasterLocation) -> BootstrapResult<Launch> {
        let template = ConfigTemplate::load(&self.config.paths.sentinel_template)?;
        let resolved =
            materialize(template.as_ref(), Some(master), Role::Sentinel, &self.defaults())?;
        let path = &self.config.paths.sentinel_config;
        write_config(path, &resolved)?;
        Ok(Launch::new(Role::Sentinel, &self.config.binaries.redis_sentinel, path.to_path_buf()))
    }

    fn write_server(&self, role: Role, resolved: &ResolvedConfig) -> BootstrapResult<Launch> {
        ensure_data_dir(&self.config.paths.data_dir)?;
        let path: &Path = &self.config.paths.server_config;
        write_config(path, resolved)?;
        Ok(Launch::new(role, &self.config.binaries.redis_server, path.to_path_buf()))
    }

    fn defaults(&self) -> Defaults {
        Defaults {
            master_name: self.config.sentinel.master_name.clone(),
            redis_port: self.config.default_master.port,
            data_dir: self.config.paths.data_dir.clone(),
        }
    }
}
