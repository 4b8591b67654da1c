//! Child processes with scratch-log redirection and scoped termination.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use log::{debug, warn};
use tokio::process::{Child, Command};

use super::error::LaunchError;

/// Program plus argument list with `{port}`, `{host}` and `{local_url}` placeholders.
#[derive(Debug, Clone)]
pub struct CommandTemplate {
    pub program: PathBuf,
    pub args: Vec<String>,
}

/// Per-attempt values substituted into a [`CommandTemplate`].
#[derive(Debug, Clone, Copy)]
pub struct TemplateVars<'a> {
    pub port: u16,
    pub host: &'a str,
    pub local_url: &'a str,
}

impl CommandTemplate {
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn render(&self, vars: TemplateVars<'_>) -> Vec<String> {
        let port = vars.port.to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{port}", &port)
                    .replace("{host}", vars.host)
                    .replace("{local_url}", vars.local_url)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    Graceful,
    Force,
}

/// A spawned child whose stdout and stderr go to a scratch log.
///
/// On unix the child leads its own process group, so wrapper scripts and
/// their descendants are signalled together. Termination is idempotent: the
/// group is sent the graceful signal at most once through
/// [`terminate`](Self::terminate), and dropping a child that has not exited
/// kills it even if it was already asked to stop.
#[derive(Debug)]
pub struct ChildProcess {
    name: &'static str,
    child: Child,
    pid: Option<u32>,
    log_path: PathBuf,
    signalled: bool,
    killed: bool,
}

impl ChildProcess {
    pub fn spawn(
        name: &'static str,
        program: &Path,
        args: &[String],
        cwd: &Path,
        log_path: &Path,
    ) -> Result<Self, LaunchError> {
        let log = std::fs::File::create(log_path).map_err(|e| LaunchError::io(log_path, e))?;
        let log_err = log.try_clone().map_err(|e| LaunchError::io(log_path, e))?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err));

        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd.spawn().map_err(|source| LaunchError::Spawn {
            name,
            program: program.display().to_string(),
            source,
        })?;
        let pid = child.id();

        debug!(
            "spawned {name} (pid {pid:?}): {} {} > {}",
            program.display(),
            args.join(" "),
            log_path.display()
        );

        Ok(Self {
            name,
            child,
            pid,
            log_path: log_path.to_path_buf(),
            signalled: false,
            killed: false,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// `Some(status)` once the child has exited.
    pub fn exit_status(&mut self) -> Option<ExitStatus> {
        match self.child.try_wait() {
            Ok(status) => status,
            Err(e) => {
                warn!("failed to poll {} (pid {:?}): {e}", self.name, self.pid);
                None
            }
        }
    }

    pub fn is_alive(&mut self) -> bool {
        self.exit_status().is_none()
    }

    /// Send the graceful stop signal. Returns `false` if this child was
    /// already signalled.
    pub fn terminate(&mut self) -> bool {
        if self.signalled {
            return false;
        }
        self.signalled = true;
        debug!("terminating {} (pid {:?})", self.name, self.pid);
        self.send(Stop::Graceful);
        true
    }

    /// Terminate and reap, escalating to a hard kill after `grace`.
    /// Returns whether this call did the signalling.
    pub async fn shutdown(&mut self, grace: Duration) -> bool {
        let first = self.terminate();

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => debug!("{} exited: {status}", self.name),
            Ok(Err(e)) => warn!("failed to reap {}: {e}", self.name),
            Err(_) => {
                warn!(
                    "{} (pid {:?}) still running after {grace:?}, killing",
                    self.name, self.pid
                );
                self.send(Stop::Force);
                if let Err(e) = self.child.wait().await {
                    warn!("failed to reap {} after kill: {e}", self.name);
                }
            }
        }

        first
    }

    #[cfg(unix)]
    fn send(&mut self, stop: Stop) {
        use nix::errno::Errno;
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        let Some(pid) = self.pid else {
            return;
        };
        let signal = match stop {
            Stop::Graceful => Signal::SIGTERM,
            Stop::Force => {
                self.killed = true;
                Signal::SIGKILL
            }
        };
        match killpg(Pid::from_raw(pid as i32), signal) {
            // group already gone
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(e) => {
                warn!("failed to send {signal} to {} group {pid}: {e}", self.name);
                let _ = self.child.start_kill();
            }
        }
    }

    #[cfg(not(unix))]
    fn send(&mut self, _stop: Stop) {
        self.killed = true;
        if let Err(e) = self.child.start_kill() {
            debug!("kill {} failed: {e}", self.name);
        }
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        // a reaped pid may already belong to someone else
        if !self.killed && self.exit_status().is_none() {
            self.send(Stop::Force);
        }
    }
}

/// Read a scratch log lossily; a missing file reads as empty.
pub async fn read_log(path: &Path) -> Result<String, LaunchError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(LaunchError::io(path, e)),
    }
}

/// Last `lines` lines of `text`.
pub fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}
