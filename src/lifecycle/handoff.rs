//! Process handoff.
//!
//! On Unix the bootstrapper `exec`s the target so redis becomes the
//! container's main process and receives its signals directly. Elsewhere
//! the target is spawned and its exit code propagated.

use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::Command;

use thiserror::Error;

use crate::node::Role;

#[derive(Debug, Error)]
#[error("failed to launch {program}: {source}")]
pub struct HandoffError {
    pub program: String,
    #[source]
    pub source: io::Error,
}

/// The process that will replace the bootstrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launch {
    pub role: Role,
    pub program: String,
    pub config_path: PathBuf,
    pub args: Vec<OsString>,
}

impl Launch {
    /// `<program> <config> --protected-mode no`
    pub fn new(role: Role, program: impl Into<String>, config_path: PathBuf) -> Self {
        let args = vec![
            config_path.clone().into_os_string(),
            "--protected-mode".into(),
            "no".into(),
        ];
        Self {
            role,
            program: program.into(),
            config_path,
            args,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }

    /// Replace the current process image. Only returns on failure.
    #[cfg(unix)]
    pub fn exec(&self) -> HandoffError {
        use std::os::unix::process::CommandExt;

        tracing::info!(role = %self.role, command = %self, "Handing off");
        let source = self.command().exec();
        HandoffError { program: self.program.clone(), source }
    }

    /// Spawn the target, wait, and return its exit code.
    #[cfg(not(unix))]
    pub fn exec(&self) -> HandoffError {
        tracing::info!(role = %self.role, command = %self, "Handing off");
        match self.command().status() {
            Ok(status) => std::process::exit(status.code().unwrap_or(1)),
            Err(source) => HandoffError { program: self.program.clone(), source },
        }
    }
}

impl fmt::Display for Launch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}
