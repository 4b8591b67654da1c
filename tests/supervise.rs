#![cfg(unix)]

mod common;

use std::time::Duration;

use common::*;
use nix::sys::signal::{Signal, raise};
use peerboot::manager::{self, Exit};

#[test]
fn repeated_interrupts_stop_children_exactly_once() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let port = free_run(1);

    let launcher = launcher(
        fast_settings(port, 10),
        idle_server(),
        reporting_tunnel(),
        dir.path(),
    );
    let mut session = rt.block_on(launcher.launch()).unwrap();
    let server_pid = session.server_pid().unwrap();
    let tunnel_pid = session.tunnel_pid().unwrap();

    manager::install_signal_handlers().unwrap();
    raise(Signal::SIGINT).unwrap();
    raise(Signal::SIGINT).unwrap();

    let exit = {
        let _guard = rt.enter();
        manager::supervise(&mut session, Duration::from_secs(5))
    };
    assert_eq!(exit, Exit::Interrupted(Signal::SIGINT));

    assert_eq!(rt.block_on(session.shutdown(Duration::from_secs(2))), 2);

    // later signals and repeated cleanup are no-ops
    raise(Signal::SIGTERM).unwrap();
    assert_eq!(session.terminate(), 0);
    assert_eq!(rt.block_on(session.shutdown(Duration::from_secs(2))), 0);

    assert!(!pid_exists(server_pid));
    assert!(!pid_exists(tunnel_pid));
    assert_eq!(manager::check_signals(), Some(Signal::SIGTERM));
    assert_eq!(manager::check_signals(), None);
}
