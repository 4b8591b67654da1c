use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Top‑level bootstrap configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    pub node: NodeConfig,
    pub tools: ToolsConfig,
    pub launcher: LauncherConfig,
    pub server: ServerConfig,
    pub tunnel: TunnelConfig,
}

/// Node directory layout and the credential files handed out over the tunnel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub root: String,
    pub required_dirs: Vec<String>,
    pub served_files: Vec<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            root: ".".into(),
            required_dirs: vec!["config".into()],
            served_files: vec![
                "config/peer.key".into(),
                "config/node_key.json".into(),
                "config/priv_validator_key.json".into(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub auto_install: bool,
    /// Where downloaded binaries go. `~` expands to the home directory.
    pub install_dir: Option<String>,
    pub interpreter_binary: String,
    pub interpreter_package: String,
    pub tunnel_binary: String,
    /// GitHub `owner/repo` the tunnel client is released from.
    pub tunnel_release_repo: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            auto_install: true,
            install_dir: None,
            interpreter_binary: "python3".into(),
            interpreter_package: "python3".into(),
            tunnel_binary: "cloudflared".into(),
            tunnel_release_repo: "cloudflare/cloudflared".into(),
        }
    }
}

impl ToolsConfig {
    /// Resolved install directory (`~/.local/bin` unless configured).
    pub fn install_dir(&self) -> PathBuf {
        match &self.install_dir {
            Some(dir) => expand_home(dir),
            None => dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("/tmp"))
                .join(".local")
                .join("bin"),
        }
    }
}

/// Retry loop and poll timings. All intervals are plain milliseconds so the
/// TOML stays readable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    pub host: String,
    pub start_port: u16,
    pub max_attempts: u32,
    pub server_settle_ms: u64,
    pub tunnel_first_wait_ms: u64,
    pub tunnel_second_wait_ms: u64,
    pub poll_interval_ms: u64,
    pub probe_timeout_ms: u64,
    pub shutdown_grace_ms: u64,
    pub health_interval_ms: u64,
    /// Lower-case substrings that mark a server log as a bind conflict.
    pub address_in_use_markers: Vec<String>,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            start_port: 8000,
            max_attempts: 10,
            server_settle_ms: 2_000,
            tunnel_first_wait_ms: 5_000,
            tunnel_second_wait_ms: 10_000,
            poll_interval_ms: 250,
            probe_timeout_ms: 500,
            shutdown_grace_ms: 3_000,
            health_interval_ms: 1_000,
            address_in_use_markers: vec![
                "address already in use".into(),
                "address in use".into(),
                "eaddrinuse".into(),
            ],
        }
    }
}

impl LauncherConfig {
    pub fn server_settle(&self) -> Duration {
        Duration::from_millis(self.server_settle_ms)
    }

    pub fn tunnel_first_wait(&self) -> Duration {
        Duration::from_millis(self.tunnel_first_wait_ms)
    }

    pub fn tunnel_second_wait(&self) -> Duration {
        Duration::from_millis(self.tunnel_second_wait_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        // zero would spin
        Duration::from_millis(self.poll_interval_ms.max(10))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    pub fn health_interval(&self) -> Duration {
        Duration::from_millis(self.health_interval_ms.max(10))
    }
}

/// Arguments for the interpreter's built-in static file server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub args: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            args: ["-m", "http.server", "{port}", "--bind", "{host}"]
                .map(String::from)
                .to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TunnelConfig {
    pub args: Vec<String>,
    /// Regex for the provider-assigned public URL; first match wins.
    pub url_pattern: String,
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            args: ["tunnel", "--no-autoupdate", "--url", "{local_url}"]
                .map(String::from)
                .to_vec(),
            url_pattern: r"https://[a-z0-9]+(?:-[a-z0-9]+)+\.trycloudflare\.com".into(),
        }
    }
}

/// Default config location: `<config dir>/peerboot/peerboot.toml`.
pub fn default_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
        .join("peerboot");
    Ok(config_dir.join("peerboot.toml"))
}

/// Load the config at `path`, writing the defaults there first if it does not exist.
pub fn load_or_create(path: &Path) -> Result<BootstrapConfig> {
    if !path.exists() {
        log::info!(
            "Config not found at {}, creating default configuration",
            path.display()
        );

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let default_toml = toml::to_string_pretty(&BootstrapConfig::default())
            .context("Failed to serialize default config")?;
        fs::write(path, default_toml).context("Failed to write config file")?;

        log::info!("Created default configuration at {}", path.display());
    }

    let cfg_str = fs::read_to_string(path).context("Failed to read config file")?;
    let cfg: BootstrapConfig = toml::from_str(&cfg_str).context("Failed to parse config")?;
    Ok(cfg)
}

pub(crate) fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}
