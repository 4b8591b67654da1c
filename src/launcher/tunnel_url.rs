//! Recovering the provider-assigned public URL from the tunnel's log.

use std::path::Path;
use std::time::Duration;

use log::debug;
use regex::Regex;
use tokio::time::Instant;
use url::Url;

use super::error::LaunchError;
use super::process::{ChildProcess, read_log};

/// Matches the tunnel provider's public hostname pattern.
#[derive(Debug, Clone)]
pub struct UrlMatcher {
    pattern: Regex,
}

impl UrlMatcher {
    pub fn new(pattern: &str) -> Result<Self, LaunchError> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    /// First match in `text` that also parses as a URL.
    pub fn find(&self, text: &str) -> Option<Url> {
        self.pattern
            .find_iter(text)
            .find_map(|m| Url::parse(m.as_str()).ok())
    }
}

/// Poll deadlines for the two-phase URL wait.
#[derive(Debug, Clone, Copy)]
pub struct UrlWait {
    pub first: Duration,
    pub second: Duration,
    pub poll: Duration,
}

/// Quick phase, then one extended phase. Returns as soon as a URL shows up;
/// stops early if the tunnel exits.
pub async fn wait_for_public_url(
    tunnel: &mut ChildProcess,
    matcher: &UrlMatcher,
    wait: UrlWait,
) -> Result<Option<Url>, LaunchError> {
    let log = tunnel.log_path().to_path_buf();

    if let Some(url) = poll_until(tunnel, matcher, &log, wait.first, wait.poll).await? {
        return Ok(Some(url));
    }
    if !tunnel.is_alive() {
        return Ok(None);
    }

    debug!(
        "no public URL in {} after {:?}, extending wait by {:?}",
        log.display(),
        wait.first,
        wait.second
    );
    poll_until(tunnel, matcher, &log, wait.second, wait.poll).await
}

async fn poll_until(
    tunnel: &mut ChildProcess,
    matcher: &UrlMatcher,
    log: &Path,
    window: Duration,
    poll: Duration,
) -> Result<Option<Url>, LaunchError> {
    let deadline = Instant::now() + window;

    loop {
        let text = read_log(log).await?;
        // Checked after the read: a URL only counts if its tunnel outlived it.
        if !tunnel.is_alive() {
            debug!("{} exited without a usable URL", tunnel.name());
            return Ok(None);
        }
        if let Some(url) = matcher.find(&text) {
            return Ok(Some(url));
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        tokio::time::sleep(poll.min(deadline - now)).await;
    }
}
