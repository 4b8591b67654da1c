//! Tunnel client download with progress reporting

use anyhow::{Context, Result, anyhow};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;

use super::extract::install_binary;
use super::github::{GitHubAsset, get_latest_release};
use super::platform::Platform;

const DOWNLOAD_CONNECT_TIMEOUT: Duration = Duration::from_secs(30); // Initial connection
const DOWNLOAD_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(300); // 5 min no data

/// Download the latest tunnel client release for `platform` into `install_dir`.
pub async fn download_tunnel_client(
    repo: &str,
    binary_name: &str,
    platform: Platform,
    install_dir: &Path,
) -> Result<PathBuf> {
    let release = get_latest_release(repo).await?;
    let asset_name = platform.tunnel_asset(binary_name);
    let asset = release.asset(&asset_name).ok_or_else(|| {
        anyhow!(
            "No {} asset found in {} release {}",
            asset_name,
            repo,
            release.tag_name
        )
    })?;

    info!(
        "Downloading {} {} ({} bytes)",
        asset.name, release.tag_name, asset.size
    );

    let temp_dir = tempfile::tempdir()?;
    let package_path = temp_dir.path().join(&asset.name);
    download_asset(asset, &package_path).await?;

    install_binary(&package_path, &asset.name, binary_name, install_dir)
        .await
        .with_context(|| format!("Failed to install {binary_name}"))
}

async fn download_asset(asset: &GitHubAsset, dest: &Path) -> Result<()> {
    let client = reqwest::Client::builder()
        .connect_timeout(DOWNLOAD_CONNECT_TIMEOUT)
        .user_agent(concat!("peerboot/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let response = client
        .get(&asset.browser_download_url)
        .send()
        .await?
        .error_for_status()?;

    let bar = ProgressBar::new(asset.size);
    bar.set_style(
        ProgressStyle::with_template("{msg} [{bar:40}] {bytes}/{total_bytes}")?
            .progress_chars("=> "),
    );
    bar.set_message(asset.name.clone());

    let mut file = tokio::fs::File::create(dest).await?;
    let mut downloaded: u64 = 0;
    let mut stream = response.bytes_stream();

    loop {
        let chunk = match timeout(DOWNLOAD_INACTIVITY_TIMEOUT, stream.next()).await {
            Ok(Some(Ok(chunk))) => chunk,
            Ok(Some(Err(e))) => {
                bar.abandon();
                return Err(e.into());
            }
            Ok(None) => break, // Stream ended normally
            Err(_) => {
                bar.abandon();
                return Err(anyhow!(
                    "Download timeout: No data received for {} seconds while downloading {}. \
                     Downloaded {}/{} bytes. Check network connection and retry.",
                    DOWNLOAD_INACTIVITY_TIMEOUT.as_secs(),
                    asset.name,
                    downloaded,
                    asset.size,
                ));
            }
        };

        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
        bar.set_position(downloaded);
    }

    file.flush().await?;
    bar.finish();

    if asset.size != 0 && downloaded != asset.size {
        return Err(anyhow!(
            "Download of {} truncated: {}/{} bytes",
            asset.name,
            downloaded,
            asset.size
        ));
    }
    Ok(())
}
