//! Port-acquiring tunnel launcher
//!
//! Walks ports upward from a starting point until a local file server and a
//! public tunnel come up on the same port, or the retry budget runs out.
//!
//! Per attempt:
//! 1. probe the port; busy ports are skipped
//! 2. start the server, let it settle, and check it is still alive
//! 3. start the tunnel against the server's local URL
//! 4. poll the tunnel log in two bounded phases for the public URL
//!
//! A server that dies with an address-in-use message is treated like a busy
//! port. A server that dies for any other reason aborts the whole launch.

mod attempt;
mod error;
mod probe;
mod process;
mod session;
mod tunnel_url;

use std::path::{Path, PathBuf};

use log::{info, warn};

pub use error::LaunchError;
pub use probe::port_in_use;
pub use process::{ChildProcess, CommandTemplate, TemplateVars};
pub use session::TunnelSession;
pub use tunnel_url::{UrlMatcher, UrlWait, wait_for_public_url};

use crate::config::{BootstrapConfig, LauncherConfig};
use attempt::{Attempt, Outcome, RetryBudget};
use process::{read_log, tail};

/// Lines of server log carried in a fatal error.
const LOG_TAIL_LINES: usize = 20;

pub struct Launcher {
    settings: LauncherConfig,
    server: CommandTemplate,
    tunnel: CommandTemplate,
    matcher: UrlMatcher,
    serve_dir: PathBuf,
}

impl Launcher {
    pub fn new(
        settings: LauncherConfig,
        server: CommandTemplate,
        tunnel: CommandTemplate,
        url_pattern: &str,
        serve_dir: impl Into<PathBuf>,
    ) -> Result<Self, LaunchError> {
        if settings.max_attempts == 0 {
            return Err(LaunchError::ZeroBudget);
        }
        Ok(Self {
            settings,
            server,
            tunnel,
            matcher: UrlMatcher::new(url_pattern)?,
            serve_dir: serve_dir.into(),
        })
    }

    /// Build from config, using resolved paths for the two external binaries.
    pub fn from_config(
        cfg: &BootstrapConfig,
        interpreter: &Path,
        tunnel_client: &Path,
        serve_dir: impl Into<PathBuf>,
    ) -> Result<Self, LaunchError> {
        Self::new(
            cfg.launcher.clone(),
            CommandTemplate::new(interpreter, cfg.server.args.clone()),
            CommandTemplate::new(tunnel_client, cfg.tunnel.args.clone()),
            &cfg.tunnel.url_pattern,
            serve_dir,
        )
    }

    /// Run the retry loop until a server/tunnel pair is up.
    ///
    /// Dropping the returned future kills any children of the in-flight attempt.
    pub async fn launch(&self) -> Result<TunnelSession, LaunchError> {
        let scratch = tempfile::Builder::new()
            .prefix("peerboot-")
            .tempdir()
            .map_err(|e| LaunchError::io(std::env::temp_dir(), e))?;

        let first_port = self.settings.start_port;
        let mut budget = RetryBudget::new(self.settings.max_attempts);
        let mut port = first_port;

        loop {
            let attempt = Attempt::new(budget.count + 1, port, &self.settings.host, scratch.path());
            info!(
                "attempt {}/{}: trying port {}",
                attempt.number, budget.max, attempt.port
            );

            match self.run_attempt(&attempt).await? {
                Outcome::Ready {
                    url,
                    server,
                    tunnel,
                } => {
                    info!("tunnel ready on port {port}: {url}");
                    return Ok(TunnelSession::new(
                        attempt.number,
                        port,
                        attempt.local_url,
                        url,
                        server,
                        tunnel,
                        scratch,
                    ));
                }
                Outcome::PortBusy => warn!("port {port} is already in use"),
                Outcome::BindConflict => {
                    warn!("server could not bind port {port} (taken after probe)")
                }
                Outcome::NoPublicUrl => warn!(
                    "tunnel on port {port} did not report a public URL within {:?}",
                    self.settings.tunnel_first_wait() + self.settings.tunnel_second_wait()
                ),
            }

            budget.spend();
            let next = port.checked_add(1);
            match next {
                Some(next) if !budget.exhausted() => port = next,
                _ => {
                    return Err(LaunchError::Exhausted {
                        attempts: budget.count,
                        first_port,
                        last_port: port,
                    });
                }
            }
        }
    }

    async fn run_attempt(&self, attempt: &Attempt) -> Result<Outcome, LaunchError> {
        let s = &self.settings;

        if port_in_use(&s.host, attempt.port, s.probe_timeout()).await {
            return Ok(Outcome::PortBusy);
        }

        let mut server = ChildProcess::spawn(
            "server",
            &self.server.program,
            &self.server.render(attempt.vars()),
            &self.serve_dir,
            &attempt.server_log,
        )?;

        tokio::time::sleep(s.server_settle()).await;

        if let Some(status) = server.exit_status() {
            let log = read_log(&attempt.server_log).await?;
            if self.is_bind_conflict(&log) {
                return Ok(Outcome::BindConflict);
            }
            return Err(LaunchError::ServerExited {
                port: attempt.port,
                status,
                log_tail: tail(&log, LOG_TAIL_LINES),
            });
        }

        let mut tunnel = ChildProcess::spawn(
            "tunnel",
            &self.tunnel.program,
            &self.tunnel.render(attempt.vars()),
            &self.serve_dir,
            &attempt.tunnel_log,
        )?;

        let wait = UrlWait {
            first: s.tunnel_first_wait(),
            second: s.tunnel_second_wait(),
            poll: s.poll_interval(),
        };

        match wait_for_public_url(&mut tunnel, &self.matcher, wait).await? {
            Some(url) => Ok(Outcome::Ready {
                url,
                server,
                tunnel,
            }),
            None => {
                tunnel.shutdown(s.shutdown_grace()).await;
                server.shutdown(s.shutdown_grace()).await;
                Ok(Outcome::NoPublicUrl)
            }
        }
    }

    fn is_bind_conflict(&self, log: &str) -> bool {
        let log = log.to_lowercase();
        self.settings
            .address_in_use_markers
            .iter()
            .any(|marker| log.contains(&marker.to_lowercase()))
    }
}
