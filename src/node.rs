//! Node identity and master location types.

use std::fmt;
use std::net::IpAddr;

use crate::config::BootstrapConfig;

/// Role this process will take on after handoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Master,
    Slave,
    Sentinel,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Master => write!(f, "master"),
            Role::Slave => write!(f, "slave"),
            Role::Sentinel => write!(f, "sentinel"),
        }
    }
}

/// Who this pod is. Built once at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdentity {
    pub pod_name: String,
    /// Initial role from configuration. The resolver may still demote a
    /// default master to a slave.
    pub role: Role,
    pub is_default_master: bool,
    /// Host strings that refer to this pod.
    pub self_addresses: Vec<String>,
}

impl NodeIdentity {
    pub fn from_config(config: &BootstrapConfig) -> Self {
        let pod_name = config.node.pod_name.clone();
        let is_default_master =
            config.node.cluster_node && pod_name == config.default_master.pod_name;

        let role = match (config.node.cluster_node, is_default_master) {
            (false, _) => Role::Sentinel,
            (true, true) => Role::Master,
            (true, false) => Role::Slave,
        };

        let mut self_addresses = vec![pod_name.clone()];
        if let Some(service) = &config.node.service_name {
            self_addresses.push(format!("{}.{}", pod_name, service));
        }
        if let Some(ip) = &config.node.pod_ip {
            self_addresses.push(ip.clone());
        }

        Self {
            pod_name,
            role,
            is_default_master,
            self_addresses,
        }
    }

    /// True if `location` names this pod. Compares hosts only; a pod runs
    /// a single redis-server.
    pub fn is_self(&self, location: &MasterLocation) -> bool {
        let host = location.host.as_str();
        if self.self_addresses.iter().any(|addr| addr.eq_ignore_ascii_case(host)) {
            return true;
        }
        if host.parse::<IpAddr>().is_ok() {
            return false;
        }
        // Pod FQDNs start with the pod name as their first label.
        host.split_once('.')
            .is_some_and(|(label, _)| label.eq_ignore_ascii_case(&self.pod_name))
    }
}

/// Where the current master lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MasterLocation {
    pub host: String,
    pub port: u16,
}

impl MasterLocation {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }

    /// An empty host means the location is unknown.
    pub fn is_known(&self) -> bool {
        !self.host.is_empty()
    }
}

impl fmt::Display for MasterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Static master used by sentinels when discovery cannot answer.
///
/// An explicit host wins; otherwise `<default-master>.<service>` when a
/// service name is configured, else the bare default-master pod name.
pub fn fallback_master(config: &BootstrapConfig) -> MasterLocation {
    let master = &config.default_master;
    let host = match (&master.host, &config.node.service_name) {
        (Some(host), _) => host.clone(),
        (None, Some(service)) => format!("{}.{}", master.pod_name, service),
        (None, None) => master.pod_name.clone(),
    };
    MasterLocation::new(host, master.port)
}
