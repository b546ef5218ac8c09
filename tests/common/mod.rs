//! Shared fakes for resolver integration tests.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;

use redis_bootstrap::config::BootstrapConfig;
use redis_bootstrap::discovery::{Discovery, DiscoveryError, ProbeError, Prober};
use redis_bootstrap::node::MasterLocation;
use redis_bootstrap::resilience::Sleeper;

pub const SENTINEL: &str = "sentinel.test:26379";

pub fn unreachable() -> Result<MasterLocation, DiscoveryError> {
    Err(DiscoveryError::Unreachable {
        endpoint: SENTINEL.to_string(),
        reason: "connection refused".to_string(),
    })
}

pub fn found(host: &str, port: u16) -> Result<MasterLocation, DiscoveryError> {
    Ok(MasterLocation::new(host, port))
}

/// Discovery that replays a script. The last entry repeats forever.
pub struct ScriptedDiscovery {
    script: RefCell<VecDeque<Result<MasterLocation, DiscoveryError>>>,
    calls: Cell<u32>,
}

impl ScriptedDiscovery {
    pub fn new(script: Vec<Result<MasterLocation, DiscoveryError>>) -> Self {
        assert!(!script.is_empty());
        Self {
            script: RefCell::new(script.into()),
            calls: Cell::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.get()
    }
}

impl Discovery for &ScriptedDiscovery {
    async fn query_master(&self) -> Result<MasterLocation, DiscoveryError> {
        self.calls.set(self.calls.get() + 1);
        let mut script = self.script.borrow_mut();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script.front().cloned().unwrap()
        }
    }

    fn endpoint(&self) -> String {
        SENTINEL.to_string()
    }
}

/// Prober that fails a fixed number of times, then succeeds. Records every
/// location it was asked about.
#[derive(Default)]
pub struct FlakyProber {
    failures_left: Cell<u32>,
    probed: RefCell<Vec<MasterLocation>>,
}

impl FlakyProber {
    pub fn failing(times: u32) -> Self {
        Self {
            failures_left: Cell::new(times),
            probed: RefCell::new(Vec::new()),
        }
    }

    pub fn probed(&self) -> Vec<MasterLocation> {
        self.probed.borrow().clone()
    }
}

impl Prober for &FlakyProber {
    async fn probe(&self, master: &MasterLocation) -> Result<(), ProbeError> {
        self.probed.borrow_mut().push(master.clone());
        let left = self.failures_left.get();
        if left > 0 {
            self.failures_left.set(left - 1);
            return Err(ProbeError {
                master: master.clone(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

/// Sleeper that returns immediately and records the requested delays.
#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: RefCell<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

impl Sleeper for &RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
    }
}

/// Config with every path under `dir` and no mounted templates.
pub fn config(dir: &Path, cluster_node: bool, pod: &str, default_master: &str) -> BootstrapConfig {
    let mut config = BootstrapConfig::default();
    config.node.cluster_node = cluster_node;
    config.node.pod_name = pod.to_string();
    config.default_master.pod_name = default_master.to_string();
    config.paths.server_template = dir.join("templates").join("redis.conf");
    config.paths.sentinel_template = dir.join("templates").join("sentinel.conf");
    config.paths.server_config = dir.join("redis-master").join("redis.conf");
    config.paths.sentinel_config = dir.join("redis-sentinel").join("sentinel.conf");
    config.paths.data_dir = dir.join("redis-master-data");
    config
}

pub fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}
