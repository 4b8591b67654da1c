use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about = "peer node bootstrap: serve the node directory through a public tunnel")]
pub struct Args {
    /// Path to configuration file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Sub‑commands (run is the default)
    #[command(subcommand)]
    pub sub: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Install missing tools, start the server and tunnel, wait for Ctrl-C
    Run,
    /// Report platform, tool and node directory state (Exit 0 = ready, 1 = not ready)
    Status,
}
