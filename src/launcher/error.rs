//! Launcher error types

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Fatal outcomes of a launch. Port conflicts and a missing tunnel URL are
/// retried inside the loop and never surface here on their own.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("local server on port {port} exited with {status} before becoming ready:\n{log_tail}")]
    ServerExited {
        port: u16,
        status: ExitStatus,
        log_tail: String,
    },

    #[error(
        "no usable port after {attempts} attempts (ports {first_port}..={last_port}); \
         every port was busy or the tunnel never reported a public URL"
    )]
    Exhausted {
        attempts: u32,
        first_port: u16,
        last_port: u16,
    },

    #[error("failed to start {name} ({program}): {source}")]
    Spawn {
        name: &'static str,
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid tunnel URL pattern: {0}")]
    UrlPattern(#[from] regex::Error),

    #[error("retry budget must be at least 1")]
    ZeroBudget,

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LaunchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LaunchError::Io {
            path: path.into(),
            source,
        }
    }
}
