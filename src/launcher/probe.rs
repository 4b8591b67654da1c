//! Best-effort port availability probe.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;

/// A port counts as in use when something accepts a TCP connection on it.
///
/// This races with other processes binding between probe and bind; the
/// server's own bind failure is the authoritative signal.
pub async fn port_in_use(host: &str, port: u16, wait: Duration) -> bool {
    matches!(
        timeout(wait, TcpStream::connect((host, port))).await,
        Ok(Ok(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bound_listener_reads_as_in_use() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(port_in_use("127.0.0.1", port, Duration::from_millis(500)).await);
    }

    #[tokio::test]
    async fn released_port_reads_as_free() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        assert!(!port_in_use("127.0.0.1", port, Duration::from_millis(500)).await);
    }
}
