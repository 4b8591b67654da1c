#![allow(dead_code)]

use std::net::TcpListener;
use std::path::Path;

use peerboot::config::LauncherConfig;
use peerboot::launcher::{CommandTemplate, Launcher};

pub const URL_PATTERN: &str = r"https://[a-z0-9]+(?:-[a-z0-9]+)+\.trycloudflare\.com";

/// Bind `len` consecutive loopback ports and keep them held.
pub fn reserve_run(len: u16) -> (u16, Vec<TcpListener>) {
    for _ in 0..100 {
        let base = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let Some(end) = base.checked_add(len) else {
            continue;
        };
        let held: Option<Vec<TcpListener>> = (base..end)
            .map(|port| TcpListener::bind(("127.0.0.1", port)).ok())
            .collect();
        if let Some(held) = held {
            return (base, held);
        }
    }
    panic!("could not find {len} consecutive free ports");
}

/// First of `len` consecutive ports that were free a moment ago.
pub fn free_run(len: u16) -> u16 {
    reserve_run(len).0
}

pub fn fast_settings(start_port: u16, max_attempts: u32) -> LauncherConfig {
    LauncherConfig {
        start_port,
        max_attempts,
        server_settle_ms: 200,
        tunnel_first_wait_ms: 2_000,
        tunnel_second_wait_ms: 2_000,
        poll_interval_ms: 50,
        probe_timeout_ms: 200,
        shutdown_grace_ms: 2_000,
        health_interval_ms: 100,
        ..LauncherConfig::default()
    }
}

pub fn sh(script: impl Into<String>) -> CommandTemplate {
    CommandTemplate::new("/bin/sh", ["-c".to_string(), script.into()])
}

/// Server stand-in that stays up without binding anything.
pub fn idle_server() -> CommandTemplate {
    sh("exec sleep 30")
}

/// Tunnel stand-in that reports a URL naming the port it was pointed at.
pub fn reporting_tunnel() -> CommandTemplate {
    sh("echo \"INF |  https://peer-{port}.trycloudflare.com  |\"; exec sleep 30")
}

pub fn launcher(
    settings: LauncherConfig,
    server: CommandTemplate,
    tunnel: CommandTemplate,
    dir: &Path,
) -> Launcher {
    Launcher::new(settings, server, tunnel, URL_PATTERN, dir).unwrap()
}

/// Whether a process with this pid still exists (zombies included).
pub fn pid_exists(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;
    kill(Pid::from_raw(pid as i32), None).is_ok()
}

/// Whether `pid` is still running; zombies awaiting a reap count as gone.
pub fn pid_running(pid: u32) -> bool {
    if !pid_exists(pid) {
        return false;
    }
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat
            .rsplit_once(')')
            .is_none_or(|(_, rest)| !rest.trim_start().starts_with('Z')),
        Err(_) => true,
    }
}

/// Poll until `pid` stops running or `within` elapses.
pub async fn wait_gone(pid: u32, within: std::time::Duration) -> bool {
    let deadline = std::time::Instant::now() + within;
    while pid_running(pid) {
        if std::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    true
}

/// Pids appended one per line by the fake scripts.
pub fn recorded_pids(path: &Path) -> Vec<u32> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .filter_map(|l| l.trim().parse().ok())
        .collect()
}
