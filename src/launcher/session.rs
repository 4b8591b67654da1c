use std::path::Path;
use std::time::Duration;

use log::info;
use tempfile::TempDir;
use url::Url;

use super::process::ChildProcess;

/// A running server + tunnel pair bound to one port.
///
/// Both children are stopped when the session is shut down or dropped, each
/// at most once.
#[derive(Debug)]
pub struct TunnelSession {
    attempt: u32,
    port: u16,
    local_url: String,
    public_url: Url,
    server: ChildProcess,
    tunnel: ChildProcess,
    // Dropped after the children so logs outlive them.
    scratch: TempDir,
}

impl TunnelSession {
    pub(crate) fn new(
        attempt: u32,
        port: u16,
        local_url: String,
        public_url: Url,
        server: ChildProcess,
        tunnel: ChildProcess,
        scratch: TempDir,
    ) -> Self {
        Self {
            attempt,
            port,
            local_url,
            public_url,
            server,
            tunnel,
            scratch,
        }
    }

    /// 1-based attempt number that succeeded.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn local_url(&self) -> &str {
        &self.local_url
    }

    pub fn public_url(&self) -> &Url {
        &self.public_url
    }

    pub fn server_pid(&self) -> Option<u32> {
        self.server.pid()
    }

    pub fn tunnel_pid(&self) -> Option<u32> {
        self.tunnel.pid()
    }

    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    /// Name and status of the first child found dead, if any.
    pub fn exited_child(&mut self) -> Option<(&'static str, std::process::ExitStatus)> {
        if let Some(status) = self.server.exit_status() {
            return Some((self.server.name(), status));
        }
        self.tunnel
            .exit_status()
            .map(|status| (self.tunnel.name(), status))
    }

    /// Signal both children. Returns how many were signalled by this call.
    pub fn terminate(&mut self) -> usize {
        // tunnel first so it stops forwarding before the server goes away
        usize::from(self.tunnel.terminate()) + usize::from(self.server.terminate())
    }

    /// Signal and reap both children, escalating to a hard kill after
    /// `grace`. Returns how many were signalled by this call.
    pub async fn shutdown(&mut self, grace: Duration) -> usize {
        let stopped =
            usize::from(self.tunnel.shutdown(grace).await) + usize::from(self.server.shutdown(grace).await);
        if stopped > 0 {
            info!("tunnel on port {} shut down", self.port);
        }
        stopped
    }
}
