//! OS package manager wrapper used to install the interpreter runtime

use anyhow::{Context, Result, bail};
use log::info;

use super::privilege;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    AptGet,
    Dnf,
    Yum,
    Apk,
    Pacman,
    Brew,
}

impl PackageManager {
    /// Probe order matters: `dnf` hosts usually also ship a `yum` shim.
    const ALL: [PackageManager; 6] = [
        PackageManager::AptGet,
        PackageManager::Dnf,
        PackageManager::Yum,
        PackageManager::Apk,
        PackageManager::Pacman,
        PackageManager::Brew,
    ];

    /// First package manager found on `PATH`.
    pub fn detect() -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|pm| which::which(pm.program()).is_ok())
    }

    pub fn program(&self) -> &'static str {
        match self {
            PackageManager::AptGet => "apt-get",
            PackageManager::Dnf => "dnf",
            PackageManager::Yum => "yum",
            PackageManager::Apk => "apk",
            PackageManager::Pacman => "pacman",
            PackageManager::Brew => "brew",
        }
    }

    /// Homebrew refuses to run as root; everything else needs it.
    pub fn needs_root(&self) -> bool {
        !matches!(self, PackageManager::Brew)
    }

    /// Index refresh to run before installing, if the manager needs one.
    pub fn refresh_command(&self) -> Option<Vec<String>> {
        match self {
            PackageManager::AptGet => Some(argv(&["apt-get", "update"])),
            _ => None,
        }
    }

    pub fn install_command(&self, package: &str) -> Vec<String> {
        match self {
            PackageManager::AptGet => argv(&["apt-get", "install", "-y", package]),
            PackageManager::Dnf => argv(&["dnf", "install", "-y", package]),
            PackageManager::Yum => argv(&["yum", "install", "-y", package]),
            PackageManager::Apk => argv(&["apk", "add", "--no-cache", package]),
            PackageManager::Pacman => argv(&["pacman", "-S", "--noconfirm", package]),
            PackageManager::Brew => argv(&["brew", "install", package]),
        }
    }
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

/// Install `package` with `pm`, escalating through sudo when needed.
pub async fn install_package(pm: PackageManager, package: &str) -> Result<()> {
    if let Some(refresh) = pm.refresh_command() {
        run(privilege::elevate(refresh, pm.needs_root())?).await?;
    }
    run(privilege::elevate(pm.install_command(package), pm.needs_root())?).await
}

async fn run(argv: Vec<String>) -> Result<()> {
    let (program, args) = argv
        .split_first()
        .context("empty package manager command")?;
    info!("Running {}", argv.join(" "));

    let output = tokio::process::Command::new(program)
        .args(args)
        .stdin(std::process::Stdio::null())
        .output()
        .await
        .with_context(|| format!("Failed to execute {program}"))?;

    if !output.status.success() {
        bail!(
            "`{}` failed ({}): {}",
            argv.join(" "),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_commands_are_non_interactive() {
        for pm in PackageManager::ALL {
            let cmd = pm.install_command("python3");
            assert_eq!(cmd[0], pm.program());
            assert_eq!(cmd.last().map(String::as_str), Some("python3"));
            let interactive_ok = matches!(pm, PackageManager::Brew);
            assert!(
                interactive_ok
                    || cmd.iter().any(|a| a == "-y" || a == "--noconfirm" || a == "--no-cache"),
                "{pm:?} would prompt"
            );
        }
    }

    #[test]
    fn only_apt_refreshes() {
        assert!(PackageManager::AptGet.refresh_command().is_some());
        assert!(PackageManager::Dnf.refresh_command().is_none());
        assert!(!PackageManager::Brew.needs_root());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_command_surfaces_stderr() {
        let err = run(argv(&["sh", "-c", "echo nope >&2; exit 4"]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("nope"));
    }
}
