//! External tool installation
//!
//! Makes sure the interpreter runtime (static file server) and the tunnel
//! client are available, installing whichever is missing:
//! - interpreter: through the host's package manager
//! - tunnel client: latest GitHub release binary into the install dir

mod detection;
mod download;
mod package;
mod privilege;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use thiserror::Error;

use crate::config::ToolsConfig;

pub use detection::{InstallationState, ToolStatus, check_installation_state, locate, tool_statuses};
pub use download::Platform;
pub use package::PackageManager;

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("unsupported platform: {os} {arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("{binary} ({role}) is not installed and auto_install is disabled")]
    MissingTool { role: &'static str, binary: String },

    #[error("no supported package manager found to install {0}")]
    NoPackageManager(String),

    #[error("{binary} was installed but still cannot be found")]
    NotFoundAfterInstall { binary: String },
}

/// Absolute paths of the two external binaries.
#[derive(Debug, Clone)]
pub struct ResolvedTools {
    pub interpreter: PathBuf,
    pub tunnel_client: PathBuf,
}

/// Ensure both tools are present, installing missing ones when allowed.
pub async fn ensure_installed(tools: &ToolsConfig) -> Result<ResolvedTools> {
    let platform = Platform::detect()?;
    let install_dir = tools.install_dir();

    log::info!("Platform: {platform:?}");

    let state = check_installation_state(tools);
    if state == InstallationState::FullyInstalled {
        log::info!("Installation verified - all tools present");
    } else {
        log::info!("Installation required: {state:?}");
    }

    let interpreter = match locate(&tools.interpreter_binary, &install_dir) {
        Some(path) => path,
        None => {
            require_auto_install(tools, "interpreter", &tools.interpreter_binary)?;
            announce(&format!("📦 Installing {}...", tools.interpreter_package));
            let pm = PackageManager::detect()
                .ok_or_else(|| InstallError::NoPackageManager(tools.interpreter_package.clone()))?;
            package::install_package(pm, &tools.interpreter_package)
                .await
                .with_context(|| format!("Failed to install {}", tools.interpreter_package))?;
            locate(&tools.interpreter_binary, &install_dir).ok_or_else(|| {
                InstallError::NotFoundAfterInstall {
                    binary: tools.interpreter_binary.clone(),
                }
            })?
        }
    };

    let tunnel_client = match locate(&tools.tunnel_binary, &install_dir) {
        Some(path) => path,
        None => {
            require_auto_install(tools, "tunnel client", &tools.tunnel_binary)?;
            announce(&format!(
                "📥 Downloading {} from {}...",
                tools.tunnel_binary, tools.tunnel_release_repo
            ));
            download::download_tunnel_client(
                &tools.tunnel_release_repo,
                &tools.tunnel_binary,
                platform,
                &install_dir,
            )
            .await
            .with_context(|| format!("Failed to install {}", tools.tunnel_binary))?
        }
    };

    log::info!(
        "Using interpreter {} and tunnel client {}",
        interpreter.display(),
        tunnel_client.display()
    );

    Ok(ResolvedTools {
        interpreter,
        tunnel_client,
    })
}

fn require_auto_install(
    tools: &ToolsConfig,
    role: &'static str,
    binary: &str,
) -> Result<(), InstallError> {
    if tools.auto_install {
        Ok(())
    } else {
        Err(InstallError::MissingTool {
            role,
            binary: binary.to_string(),
        })
    }
}

fn announce(line: &str) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)));
    let _ = writeln!(stdout, "{line}");
    let _ = stdout.reset();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_tool_without_auto_install_fails() {
        let dir = tempfile::tempdir().unwrap();
        let tools = ToolsConfig {
            auto_install: false,
            install_dir: Some(dir.path().display().to_string()),
            interpreter_binary: "peerboot-no-such-interpreter".into(),
            ..ToolsConfig::default()
        };

        let err = ensure_installed(&tools).await.unwrap_err();
        if Platform::detect().is_ok() {
            assert!(matches!(
                err.downcast_ref::<InstallError>(),
                Some(InstallError::MissingTool { role: "interpreter", .. })
            ));
        }
    }
}
