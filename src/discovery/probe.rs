//! Master liveness probe.
//!
//! Sends a RESP `PING` and treats any well-formed reply from the server as
//! proof that a redis process is listening. `-LOADING` and `-NOAUTH` count:
//! the master exists, replication will sort out the rest.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::node::MasterLocation;

const PING: &[u8] = b"*1\r\n$4\r\nPING\r\n";

/// The resolved master did not answer a liveness probe.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("master {master} unreachable: {reason}")]
pub struct ProbeError {
    pub master: MasterLocation,
    pub reason: String,
}

/// Anything that can check whether a master is up.
pub trait Prober {
    fn probe(&self, master: &MasterLocation) -> impl Future<Output = Result<(), ProbeError>>;
}

/// TCP `PING` probe.
#[derive(Debug, Clone, Copy)]
pub struct RespPing {
    timeout: Duration,
}

impl RespPing {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn ping(master: &MasterLocation) -> Result<String, std::io::Error> {
        let stream = TcpStream::connect((master.host.as_str(), master.port)).await?;
        let mut stream = BufReader::new(stream);
        stream.get_mut().write_all(PING).await?;

        let mut line = String::new();
        stream.read_line(&mut line).await?;
        Ok(line)
    }
}

impl Prober for RespPing {
    async fn probe(&self, master: &MasterLocation) -> Result<(), ProbeError> {
        let fail = |reason: String| ProbeError { master: master.clone(), reason };

        let reply = match timeout(self.timeout, Self::ping(master)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => return Err(fail(e.to_string())),
            Err(_) => return Err(fail(format!("timed out after {}s", self.timeout.as_secs()))),
        };

        if is_alive_reply(&reply) {
            tracing::debug!(master = %master, reply = %reply.trim_end(), "Master answered probe");
            Ok(())
        } else if reply.is_empty() {
            Err(fail("connection closed without reply".to_string()))
        } else {
            Err(fail(format!("unexpected reply {:?}", reply.trim_end())))
        }
    }
}

fn is_alive_reply(line: &str) -> bool {
    let line = line.trim_end();
    line.eq_ignore_ascii_case("+PONG") || (line.starts_with('-') && line.len() > 1)
}
