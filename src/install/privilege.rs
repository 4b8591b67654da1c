//! Privilege escalation for package-manager operations

use anyhow::{Result, anyhow};

/// Check if running as root
#[inline]
pub fn is_root() -> bool {
    nix::unistd::geteuid().is_root()
}

/// Prefix `argv` with `sudo` when it needs root and we are not root.
pub fn elevate(argv: Vec<String>, needs_root: bool) -> Result<Vec<String>> {
    elevate_as(argv, needs_root, is_root(), which::which("sudo").is_ok())
}

fn elevate_as(
    argv: Vec<String>,
    needs_root: bool,
    root: bool,
    have_sudo: bool,
) -> Result<Vec<String>> {
    if !needs_root || root {
        return Ok(argv);
    }
    if !have_sudo {
        return Err(anyhow!(
            "`{}` needs root privileges and sudo is not available; rerun as root",
            argv.join(" ")
        ));
    }
    let mut elevated = Vec::with_capacity(argv.len() + 1);
    elevated.push("sudo".to_string());
    elevated.extend(argv);
    Ok(elevated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv() -> Vec<String> {
        vec!["apt-get".into(), "install".into(), "-y".into(), "python3".into()]
    }

    #[test]
    fn root_runs_unchanged() {
        assert_eq!(elevate_as(argv(), true, true, false).unwrap(), argv());
    }

    #[test]
    fn unprivileged_gets_sudo() {
        let cmd = elevate_as(argv(), true, false, true).unwrap();
        assert_eq!(cmd[0], "sudo");
        assert_eq!(&cmd[1..], argv().as_slice());
    }

    #[test]
    fn missing_sudo_is_an_error() {
        assert!(elevate_as(argv(), true, false, false).is_err());
    }

    #[test]
    fn user_level_managers_skip_sudo() {
        let brew = vec!["brew".to_string(), "install".into(), "python3".into()];
        assert_eq!(elevate_as(brew.clone(), false, false, false).unwrap(), brew);
    }
}
