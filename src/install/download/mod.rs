//! GitHub release download of the tunnel client
//!
//! - `platform` - Platform detection and asset selection
//! - `github` - GitHub API interaction for release discovery
//! - `extract` - Placing the binary (bare or tarball) into the install dir
//! - `core` - Download with progress tracking

mod core;
mod extract;
mod github;
mod platform;

pub use self::core::download_tunnel_client;
pub use platform::Platform;
