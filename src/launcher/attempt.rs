use std::net::IpAddr;
use std::path::{Path, PathBuf};

use url::Url;

use super::process::{ChildProcess, TemplateVars};

/// Per-iteration state of the launch loop.
#[derive(Debug, Clone)]
pub(crate) struct Attempt {
    pub number: u32,
    pub port: u16,
    pub host: String,
    pub local_url: String,
    pub server_log: PathBuf,
    pub tunnel_log: PathBuf,
}

impl Attempt {
    pub fn new(number: u32, port: u16, host: &str, scratch: &Path) -> Self {
        Self {
            number,
            port,
            host: host.to_string(),
            local_url: local_url(host, port),
            server_log: scratch.join(format!("server-{number}-{port}.log")),
            tunnel_log: scratch.join(format!("tunnel-{number}-{port}.log")),
        }
    }

    pub fn vars(&self) -> TemplateVars<'_> {
        TemplateVars {
            port: self.port,
            host: &self.host,
            local_url: &self.local_url,
        }
    }
}

/// URL the tunnel forwards to. Wildcard binds are reached through `localhost`.
fn local_url(host: &str, port: u16) -> String {
    match host.parse::<IpAddr>() {
        Ok(ip) if ip.is_unspecified() => format!("http://localhost:{port}"),
        Ok(IpAddr::V6(ip)) => format!("http://[{ip}]:{port}"),
        _ => format!("http://{host}:{port}"),
    }
}

/// How one attempt ended, short of a fatal error.
#[derive(Debug)]
pub(crate) enum Outcome {
    Ready {
        url: Url,
        server: ChildProcess,
        tunnel: ChildProcess,
    },
    /// Probe found something listening.
    PortBusy,
    /// Server died reporting the address was taken.
    BindConflict,
    /// Tunnel never printed a public URL; both children were stopped.
    NoPublicUrl,
}

/// Count of failed attempts against a fixed maximum.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RetryBudget {
    pub count: u32,
    pub max: u32,
}

impl RetryBudget {
    pub fn new(max: u32) -> Self {
        Self { count: 0, max }
    }

    pub fn spend(&mut self) {
        self.count += 1;
    }

    pub fn exhausted(&self) -> bool {
        self.count >= self.max
    }
}
