//! Tool detection
//!
//! A tool counts as installed when its binary is on `PATH` or sits in the
//! configured install directory (which is often not on `PATH` yet).

use std::path::{Path, PathBuf};

use crate::config::ToolsConfig;

/// Installation state enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallationState {
    /// Neither tool found
    NotInstalled,
    /// One of the two tools is missing
    PartiallyInstalled,
    /// Interpreter and tunnel client both found
    FullyInstalled,
}

/// Where a single tool was found, if anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolStatus {
    pub role: &'static str,
    pub binary: String,
    pub path: Option<PathBuf>,
}

/// Locate `binary` on `PATH`, then in `install_dir`.
pub fn locate(binary: &str, install_dir: &Path) -> Option<PathBuf> {
    if let Ok(path) = which::which(binary) {
        return Some(path);
    }
    let candidate = install_dir.join(binary);
    is_executable(&candidate).then_some(candidate)
}

fn is_executable(path: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

pub fn tool_statuses(tools: &ToolsConfig) -> [ToolStatus; 2] {
    let install_dir = tools.install_dir();
    [
        ToolStatus {
            role: "interpreter",
            binary: tools.interpreter_binary.clone(),
            path: locate(&tools.interpreter_binary, &install_dir),
        },
        ToolStatus {
            role: "tunnel client",
            binary: tools.tunnel_binary.clone(),
            path: locate(&tools.tunnel_binary, &install_dir),
        },
    ]
}

pub fn check_installation_state(tools: &ToolsConfig) -> InstallationState {
    let found = tool_statuses(tools)
        .iter()
        .filter(|s| s.path.is_some())
        .count();
    match found {
        0 => InstallationState::NotInstalled,
        2 => InstallationState::FullyInstalled,
        _ => InstallationState::PartiallyInstalled,
    }
}
