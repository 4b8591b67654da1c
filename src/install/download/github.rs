//! GitHub release API interaction

use anyhow::{Result, anyhow};
use serde::Deserialize;

/// GitHub release metadata from API
#[derive(Deserialize, Debug)]
pub struct GitHubRelease {
    pub tag_name: String,
    pub assets: Vec<GitHubAsset>,
}

/// GitHub release asset metadata
#[derive(Deserialize, Debug, Clone)]
pub struct GitHubAsset {
    pub name: String,
    pub browser_download_url: String,
    pub size: u64,
}

impl GitHubRelease {
    pub fn asset(&self, name: &str) -> Option<&GitHubAsset> {
        self.assets.iter().find(|a| a.name == name)
    }
}

/// Fetch latest release of `owner/repo`
pub async fn get_latest_release(repo: &str) -> Result<GitHubRelease> {
    let url = format!("https://api.github.com/repos/{repo}/releases/latest");

    let client = reqwest::Client::builder()
        .user_agent(concat!("peerboot/", env!("CARGO_PKG_VERSION")))
        .timeout(std::time::Duration::from_secs(30))
        .build()?;

    let response = client.get(&url).send().await?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "GitHub API error for {}: HTTP {}",
            repo,
            response.status()
        ));
    }

    let release: GitHubRelease = response.json().await?;
    Ok(release)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_lookup_is_exact() {
        let release = GitHubRelease {
            tag_name: "2024.6.1".into(),
            assets: vec![
                GitHubAsset {
                    name: "cloudflared-linux-arm64".into(),
                    browser_download_url: "https://example.invalid/arm64".into(),
                    size: 1,
                },
                GitHubAsset {
                    name: "cloudflared-linux-arm".into(),
                    browser_download_url: "https://example.invalid/arm".into(),
                    size: 2,
                },
            ],
        };
        assert_eq!(release.asset("cloudflared-linux-arm").unwrap().size, 2);
        assert!(release.asset("cloudflared-linux-amd64").is_none());
    }
}
