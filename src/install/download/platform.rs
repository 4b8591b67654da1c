//! Platform detection for tunnel client asset selection

use once_cell::sync::OnceCell;

use crate::install::InstallError;

/// Supported OS/architecture pairs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    LinuxAmd64,
    LinuxArm64,
    LinuxArm,
    MacOsArm64,  // Apple Silicon
    MacOsX8664,  // Intel
}

/// Global cache for platform detection (initialized once, used everywhere)
static PLATFORM_CACHE: OnceCell<Platform> = OnceCell::new();

impl Platform {
    /// Detect current platform (cached after first call)
    pub fn detect() -> Result<Self, InstallError> {
        PLATFORM_CACHE
            .get_or_try_init(|| Self::from_parts(std::env::consts::OS, std::env::consts::ARCH))
            .copied()
    }

    pub fn from_parts(os: &str, arch: &str) -> Result<Self, InstallError> {
        match (os, arch) {
            ("linux", "x86_64") => Ok(Platform::LinuxAmd64),
            ("linux", "aarch64") => Ok(Platform::LinuxArm64),
            ("linux", "arm") => Ok(Platform::LinuxArm),
            ("macos", "aarch64") => Ok(Platform::MacOsArm64),
            ("macos", "x86_64") => Ok(Platform::MacOsX8664),
            (os, arch) => Err(InstallError::UnsupportedPlatform {
                os: os.to_string(),
                arch: arch.to_string(),
            }),
        }
    }

    /// Release asset name of the tunnel client for this platform.
    pub fn tunnel_asset(&self, binary: &str) -> String {
        match self {
            Platform::LinuxAmd64 => format!("{binary}-linux-amd64"),
            Platform::LinuxArm64 => format!("{binary}-linux-arm64"),
            Platform::LinuxArm => format!("{binary}-linux-arm"),
            Platform::MacOsArm64 => format!("{binary}-darwin-arm64.tgz"),
            Platform::MacOsX8664 => format!("{binary}-darwin-amd64.tgz"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_pairs_map_to_assets() {
        let cases = [
            ("linux", "x86_64", "cloudflared-linux-amd64"),
            ("linux", "aarch64", "cloudflared-linux-arm64"),
            ("linux", "arm", "cloudflared-linux-arm"),
            ("macos", "aarch64", "cloudflared-darwin-arm64.tgz"),
            ("macos", "x86_64", "cloudflared-darwin-amd64.tgz"),
        ];
        for (os, arch, asset) in cases {
            let platform = Platform::from_parts(os, arch).unwrap();
            assert_eq!(platform.tunnel_asset("cloudflared"), asset);
        }
    }

    #[test]
    fn unknown_pairs_are_unsupported() {
        for (os, arch) in [("windows", "x86_64"), ("linux", "riscv64"), ("freebsd", "x86_64")] {
            assert!(matches!(
                Platform::from_parts(os, arch),
                Err(InstallError::UnsupportedPlatform { .. })
            ));
        }
    }
}
