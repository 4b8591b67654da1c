//! Peer node bootstrap
//!
//! Verifies the node directory, installs the interpreter runtime and the
//! tunnel client when missing, serves the node directory over a local file
//! server and exposes it through a public tunnel.

pub mod config;
pub mod install;
pub mod instructions;
pub mod launcher;
pub mod manager;
pub mod workspace;
