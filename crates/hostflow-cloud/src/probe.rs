//! TCP reachability probe
//!
//! Used after boot to wait until the host accepts SSH connections. This is
//! the only retry loop bounded by wall-clock time.

use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{Instant, sleep, timeout};

pub const DEFAULT_SSH_PORT: u16 = 22;
pub const DEFAULT_REACHABILITY_TIMEOUT: Duration = Duration::from_secs(600);

/// Waits for a TCP endpoint to accept connections
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// `true` on the first successful connect, `false` once `limit` elapsed
    async fn wait_until_reachable(&self, host: &str, port: u16, limit: Duration) -> bool;
}

/// Connect-once-per-interval probe
#[derive(Debug, Clone)]
pub struct TcpProbe {
    interval: Duration,
    connect_timeout: Duration,
}

impl TcpProbe {
    pub fn new() -> Self {
        Self {
            interval: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    async fn is_open(&self, host: &str, port: u16, budget: Duration) -> bool {
        let limit = self.connect_timeout.min(budget).max(Duration::from_millis(1));
        matches!(timeout(limit, TcpStream::connect((host, port))).await, Ok(Ok(_)))
    }
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReachabilityProbe for TcpProbe {
    async fn wait_until_reachable(&self, host: &str, port: u16, limit: Duration) -> bool {
        let deadline = Instant::now() + limit;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let remaining = deadline.saturating_duration_since(Instant::now());

            if self.is_open(host, port, remaining).await {
                tracing::info!(host, port, attempts, "Endpoint is reachable");
                return true;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                tracing::warn!(
                    host,
                    port,
                    attempts,
                    timeout_secs = limit.as_secs(),
                    "Endpoint never became reachable"
                );
                return false;
            }

            tracing::debug!(host, port, attempt = attempts, "Endpoint not reachable yet");
            sleep(self.interval.min(remaining)).await;
        }
    }
}
