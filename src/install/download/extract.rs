//! Placing a downloaded release asset into the install directory.
//!
//! Assets are either a bare executable or a gzipped tarball holding one.

use anyhow::{Context, Result, anyhow};
use flate2::read::GzDecoder;
use std::path::{Path, PathBuf};
use tar::Archive;

fn is_tarball(asset_name: &str) -> bool {
    asset_name.ends_with(".tgz") || asset_name.ends_with(".tar.gz")
}

/// Install `binary_name` from `package_path` into `install_dir`, mode 0755.
///
/// The binary is written next to its final name and renamed into place so a
/// half-written file is never picked up from `PATH`.
pub async fn install_binary(
    package_path: &Path,
    asset_name: &str,
    binary_name: &str,
    install_dir: &Path,
) -> Result<PathBuf> {
    tokio::fs::create_dir_all(install_dir)
        .await
        .with_context(|| format!("Failed to create {}", install_dir.display()))?;

    let final_path = install_dir.join(binary_name);
    let partial_path = install_dir.join(format!(".{binary_name}.partial"));

    if is_tarball(asset_name) {
        // Wrap CPU-bound tar extraction in spawn_blocking
        let package_path = package_path.to_path_buf();
        let binary_name = binary_name.to_string();
        let partial = partial_path.clone();
        tokio::task::spawn_blocking(move || extract_from_tarball(&package_path, &binary_name, &partial))
            .await??;
    } else {
        tokio::fs::copy(package_path, &partial_path)
            .await
            .with_context(|| format!("Failed to copy {}", package_path.display()))?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(&partial_path, std::fs::Permissions::from_mode(0o755)).await?;
    }

    tokio::fs::rename(&partial_path, &final_path)
        .await
        .with_context(|| format!("Failed to move binary into {}", final_path.display()))?;

    Ok(final_path)
}

fn extract_from_tarball(tarball: &Path, binary_name: &str, dest: &Path) -> Result<()> {
    let file = std::fs::File::open(tarball)
        .with_context(|| format!("Failed to open {}", tarball.display()))?;
    let mut archive = Archive::new(GzDecoder::new(file));

    for entry in archive.entries()? {
        let mut entry = entry?;
        let is_binary = entry.header().entry_type().is_file()
            && entry.path()?.file_name().and_then(|n| n.to_str()) == Some(binary_name);
        if is_binary {
            entry.unpack(dest)?;
            return Ok(());
        }
    }

    Err(anyhow!(
        "Binary {} not found in {}",
        binary_name,
        tarball.display()
    ))
}
