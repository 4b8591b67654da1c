mod cli;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{error, info, warn};
use tokio::runtime::Runtime;

use peerboot::config::{self, BootstrapConfig};
use peerboot::install::{self, Platform};
use peerboot::instructions;
use peerboot::launcher::Launcher;
use peerboot::manager::{self, Exit};
use peerboot::workspace;

fn main() {
    // Initialize logger with custom format
    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let rt = match Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("FATAL: Failed to create Tokio runtime: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = real_main(&rt) {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn real_main(rt: &Runtime) -> Result<()> {
    let args = cli::Args::parse();

    let cfg_path = match args.config {
        Some(path) => path,
        None => config::default_config_path()?,
    };
    let cfg = config::load_or_create(&cfg_path)?;
    info!("Using config from: {}", cfg_path.display());

    match args.sub.unwrap_or(cli::Cmd::Run) {
        cli::Cmd::Run => run_bootstrap(rt, &cfg),
        cli::Cmd::Status => handle_status(&cfg),
    }
}

fn run_bootstrap(rt: &Runtime, cfg: &BootstrapConfig) -> Result<()> {
    let root = workspace::verify(&cfg.node).context("Node directory check failed")?;
    let files = workspace::served_files(&cfg.node, &root)?;
    for file in files.iter().filter(|f| !f.present) {
        warn!("served file {} is missing", file.absolute.display());
    }

    let tools = rt
        .block_on(install::ensure_installed(&cfg.tools))
        .context("Failed to install required tools")?;

    let launcher = Launcher::from_config(cfg, &tools.interpreter, &tools.tunnel_client, &root)?;

    manager::install_signal_handlers()?;
    let mut session = rt.block_on(manager::launch_until_signal(&launcher))?;
    info!("attempt logs in {}", session.scratch_dir().display());

    instructions::print_instructions(&session, &files)?;

    let exit = {
        let _guard = rt.enter();
        manager::supervise(&mut session, cfg.launcher.health_interval())
    };
    rt.block_on(session.shutdown(cfg.launcher.shutdown_grace()));

    match exit {
        Exit::Interrupted(sig) => {
            info!("stopped after {sig}");
            Ok(())
        }
        Exit::ChildExited { name, status } => bail!("{name} exited unexpectedly ({status})"),
    }
}

/// Handle status command - report whether a `run` would start without installing anything
fn handle_status(cfg: &BootstrapConfig) -> Result<()> {
    let mut ready = true;

    match Platform::detect() {
        Ok(platform) => println!("platform:      {platform:?}"),
        Err(e) => {
            println!("platform:      {e}");
            ready = false;
        }
    }

    for tool in install::tool_statuses(&cfg.tools) {
        match &tool.path {
            Some(path) => println!("{:<14} {} ({})", format!("{}:", tool.role), tool.binary, path.display()),
            None => {
                println!("{:<14} {} (missing)", format!("{}:", tool.role), tool.binary);
                ready = false;
            }
        }
    }

    match workspace::verify(&cfg.node) {
        Ok(root) => {
            println!("node root:     {}", root.display());
            for file in workspace::served_files(&cfg.node, &root)? {
                let mark = if file.present { "ok" } else { "missing" };
                println!("  {:<40} {mark}", file.relative);
            }
        }
        Err(e) => {
            println!("node root:     {e}");
            ready = false;
        }
    }

    if !ready {
        bail!("peerboot is not ready to run");
    }
    Ok(())
}
