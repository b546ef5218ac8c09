//! Config templates and materialization.
//!
//! A template is a list of lines that may carry `%master-ip%` and
//! `%master-port%`. Rendering applies a placeholder map and produces new
//! text; the template itself is never modified.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::node::{MasterLocation, Role};

pub const MASTER_IP: &str = "%master-ip%";
pub const MASTER_PORT: &str = "%master-port%";

#[derive(Debug, Error)]
pub enum TemplateError {
    /// The template file exists but could not be read. Never falls back to
    /// defaults.
    #[error("config template {path} is unreadable: {source}")]
    Unreadable { path: PathBuf, source: io::Error },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MaterializeError {
    #[error("{role} config requires a known master location")]
    MasterRequired { role: Role },
}

/// Ordered config lines, possibly containing placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigTemplate {
    lines: Vec<String>,
}

impl ConfigTemplate {
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { lines: lines.into_iter().map(Into::into).collect() }
    }

    pub fn parse(text: &str) -> Self {
        Self::from_lines(text.lines())
    }

    /// Load a mounted template. A missing file is `Ok(None)`; any other
    /// read failure is an error.
    pub fn load(path: &Path) -> Result<Option<Self>, TemplateError> {
        match fs::read_to_string(path) {
            Ok(text) => {
                tracing::info!(path = %path.display(), "Loaded config template");
                Ok(Some(Self::parse(&text)))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No config template mounted, using defaults");
                Ok(None)
            }
            Err(source) => Err(TemplateError::Unreadable { path: path.to_path_buf(), source }),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn has_placeholders(&self) -> bool {
        self.lines.iter().any(|l| l.contains(MASTER_IP) || l.contains(MASTER_PORT))
    }

    /// Substitute every occurrence of every key in `vars`.
    pub fn render(&self, vars: &BTreeMap<&str, String>) -> ResolvedConfig {
        let lines = self
            .lines
            .iter()
            .map(|line| {
                vars.iter()
                    .fold(line.clone(), |acc, (token, value)| acc.replace(token, value))
            })
            .collect();
        ResolvedConfig { lines }
    }

    /// Drop every line that still carries a placeholder.
    fn without_placeholders(self) -> Self {
        let lines = self
            .lines
            .into_iter()
            .filter(|l| !l.contains(MASTER_IP) && !l.contains(MASTER_PORT))
            .collect();
        Self { lines }
    }

    fn with_line(mut self, line: String) -> Self {
        self.lines.push(line);
        self
    }
}

/// Final config text, ready to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    lines: Vec<String>,
}

impl ResolvedConfig {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn to_text(&self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }

    /// Back to a template, e.g. to check re-materialization is a no-op.
    pub fn into_template(self) -> ConfigTemplate {
        ConfigTemplate { lines: self.lines }
    }
}

/// Values baked into synthesized defaults.
#[derive(Debug, Clone)]
pub struct Defaults {
    pub master_name: String,
    pub redis_port: u16,
    pub data_dir: PathBuf,
}

impl Defaults {
    /// Base redis-server config shared by master and slave.
    pub fn server(&self) -> ConfigTemplate {
        ConfigTemplate::from_lines([
            "bind 0.0.0.0".to_string(),
            format!("port {}", self.redis_port),
            format!("dir {}", self.data_dir.display()),
            "appendonly yes".to_string(),
        ])
    }

    /// Sentinel config monitoring the placeholder master.
    pub fn sentinel(&self) -> ConfigTemplate {
        let name = &self.master_name;
        ConfigTemplate::from_lines([
            format!("sentinel monitor {} {} {} 2", name, MASTER_IP, MASTER_PORT),
            format!("sentinel down-after-milliseconds {} 60000", name),
            format!("sentinel failover-timeout {} 180000", name),
            format!("sentinel parallel-syncs {} 1", name),
            "bind 0.0.0.0".to_string(),
        ])
    }
}

fn master_vars(master: &MasterLocation) -> BTreeMap<&'static str, String> {
    BTreeMap::from([
        (MASTER_IP, master.host.clone()),
        (MASTER_PORT, master.port.to_string()),
    ])
}

/// Produce the config for `role`.
///
/// - Master: the template (or default server config) verbatim, minus any
///   line that references the master placeholders.
/// - Slave: placeholders substituted; a template without placeholders gets
///   `slaveof <host> <port>` appended instead.
/// - Sentinel: placeholders substituted into the template or the default
///   sentinel config.
pub fn materialize(
    template: Option<&ConfigTemplate>,
    master: Option<&MasterLocation>,
    role: Role,
    defaults: &Defaults,
) -> Result<ResolvedConfig, MaterializeError> {
    let template = match (template, role) {
        (Some(t), _) => t.clone(),
        (None, Role::Master | Role::Slave) => defaults.server(),
        (None, Role::Sentinel) => defaults.sentinel(),
    };

    if role == Role::Master {
        if template.has_placeholders() {
            tracing::info!("Dropping placeholder lines from template for master role");
        }
        return Ok(template.without_placeholders().render(&BTreeMap::new()));
    }

    let master = master
        .filter(|m| m.is_known())
        .ok_or(MaterializeError::MasterRequired { role })?;

    let template = if role == Role::Slave && !template.has_placeholders() {
        template.with_line(format!("slaveof {} {}", master.host, master.port))
    } else {
        template
    };

    Ok(template.render(&master_vars(master)))
}
