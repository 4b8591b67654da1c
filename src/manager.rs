//! Holding a running tunnel session until interrupted.

use std::process::ExitStatus;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crossbeam_channel::{select, tick};
use log::{error, info};
use nix::sys::signal::Signal;

use crate::launcher::{LaunchError, Launcher, TunnelSession};

/// How often the signal flag is polled.
const SIGNAL_POLL: Duration = Duration::from_millis(200);

/// Why [`supervise`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Interrupted(Signal),
    ChildExited {
        name: &'static str,
        status: ExitStatus,
    },
}

/// Why [`launch_until_signal`] produced no session.
#[derive(Debug, thiserror::Error)]
pub enum StartError {
    #[error(transparent)]
    Launch(#[from] LaunchError),
    #[error("interrupted by {0} during launch")]
    Interrupted(Signal),
}

/// Run the launch loop, abandoning it as soon as SIGINT or SIGTERM arrives.
///
/// The in-flight attempt is dropped on interrupt, which kills whatever
/// children it had started.
pub async fn launch_until_signal(launcher: &Launcher) -> Result<TunnelSession, StartError> {
    tokio::select! {
        res = launcher.launch() => Ok(res?),
        sig = wait_for_signal() => {
            info!("signal {sig:?} during launch, abandoning attempt");
            Err(StartError::Interrupted(sig))
        }
    }
}

/// Block until a signal arrives or one of the session's children dies.
///
/// Must be called from within a tokio runtime context (`Runtime::enter`),
/// since child liveness is polled through tokio's process handles.
pub fn supervise(session: &mut TunnelSession, health_interval: Duration) -> Exit {
    let sig_tick = tick(SIGNAL_POLL);
    let health_tick = tick(health_interval);

    loop {
        select! {
            recv(sig_tick) -> _ => {
                if let Some(sig) = check_signals() {
                    info!("signal {sig:?} – orderly shutdown");
                    return Exit::Interrupted(sig);
                }
            }
            recv(health_tick) -> _ => {
                if let Some((name, status)) = session.exited_child() {
                    error!("{name} exited unexpectedly ({status}); shutting down");
                    return Exit::ChildExited { name, status };
                }
            }
        }
    }
}

/// Resolve once SIGINT or SIGTERM has been received.
pub async fn wait_for_signal() -> Signal {
    loop {
        if let Some(sig) = check_signals() {
            return sig;
        }
        tokio::time::sleep(SIGNAL_POLL).await;
    }
}

// Cheap, polling‑based Unix signal handling (lock‑free).
static RECEIVED_SIGNAL: LazyLock<AtomicUsize> = LazyLock::new(|| AtomicUsize::new(0));

pub fn install_signal_handlers() -> anyhow::Result<()> {
    use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet};
    extern "C" fn handler(sig: i32) {
        RECEIVED_SIGNAL.store(sig as usize, Ordering::SeqCst);
    }
    // Force the lazy init outside of signal context.
    LazyLock::force(&RECEIVED_SIGNAL);
    let action = SigAction::new(
        SigHandler::Handler(handler),
        SaFlags::empty(),
        SigSet::empty(),
    );
    for sig in [Signal::SIGINT, Signal::SIGTERM] {
        // Safety: the handler only performs an atomic store.
        unsafe { signal::sigaction(sig, &action) }.map_err(|e| {
            anyhow::anyhow!(
                "Failed to register {sig} handler: {e}. Signal handling is required to clean up child processes."
            )
        })?;
    }
    Ok(())
}

/// Non‑blocking check – returns Some(signal) once per delivery burst.
pub fn check_signals() -> Option<Signal> {
    let val = RECEIVED_SIGNAL.swap(0, Ordering::AcqRel);
    if val == 0 {
        None
    } else {
        match Signal::try_from(val as i32) {
            Ok(sig) => Some(sig),
            Err(e) => {
                log::error!("BUG: Invalid signal number {val} from signal handler: {e}.");
                None
            }
        }
    }
}
