//! Master server health monitoring.
//!
//! Wraps the `health-check` operation with consecutive success/failure
//! thresholds so that a single dropped request does not flip the reported
//! status. [`MasterServerMonitor::watch`] runs the check periodically and
//! publishes status changes on a `tokio::sync::watch` channel.

use crate::client::PadroneClient;
use crate::transport::Transport;
use hyper::StatusCode;
use std::fmt;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Health monitor configuration.
#[derive(Debug, Clone)]
pub struct HealthMonitorConfig {
    /// Interval between periodic checks.
    pub interval: Duration,
    /// Number of consecutive failures before considering the server unhealthy.
    pub failure_threshold: u32,
    /// Number of consecutive successes before considering it healthy again.
    pub success_threshold: u32,
}

impl Default for HealthMonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            failure_threshold: 3,
            success_threshold: 1,
        }
    }
}

impl HealthMonitorConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn with_success_threshold(mut self, threshold: u32) -> Self {
        self.success_threshold = threshold;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    /// Not enough checks have run to decide.
    Unknown,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
            HealthStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Result of a single check.
#[derive(Debug, Clone)]
pub struct HealthCheckResult {
    /// Status after this check was counted.
    pub status: HealthStatus,
    /// HTTP status the server answered with, if the call got that far.
    pub http_status: Option<StatusCode>,
    /// Round trip time, on success.
    pub latency: Option<Duration>,
    pub error: Option<String>,
}

/// Run of identical outcomes ending at the latest check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Streak {
    Empty,
    Passing(u32),
    Failing(u32),
}

/// Tracks master server health across checks.
pub struct MasterServerMonitor {
    config: HealthMonitorConfig,
    streak: Streak,
    current_status: HealthStatus,
}

impl MasterServerMonitor {
    pub fn new(config: HealthMonitorConfig) -> Self {
        Self {
            config,
            streak: Streak::Empty,
            current_status: HealthStatus::Unknown,
        }
    }

    pub fn status(&self) -> HealthStatus {
        self.current_status
    }

    /// Count one outcome. Returns the new status if it changed.
    fn record(&mut self, passed: bool) -> Option<HealthStatus> {
        self.streak = match (self.streak, passed) {
            (Streak::Passing(n), true) => Streak::Passing(n.saturating_add(1)),
            (Streak::Failing(n), false) => Streak::Failing(n.saturating_add(1)),
            (_, true) => Streak::Passing(1),
            (_, false) => Streak::Failing(1),
        };

        let next = match self.streak {
            Streak::Passing(n) if n >= self.config.success_threshold => HealthStatus::Healthy,
            Streak::Failing(n) if n >= self.config.failure_threshold => HealthStatus::Unhealthy,
            _ => self.current_status,
        };
        if next == self.current_status {
            return None;
        }
        self.current_status = next;
        Some(next)
    }

    /// Run one `health-check` call and count it. Only `200 OK` passes.
    pub async fn check<T: Transport>(&mut self, client: &PadroneClient<T>) -> HealthCheckResult {
        let start = Instant::now();
        let (http_status, error) = match client.health_check().await {
            Ok(status) if status == StatusCode::OK => (Some(status), None),
            Ok(status) => (Some(status), Some(format!("master server answered {}", status))),
            Err(e) => (None, Some(e.to_string())),
        };
        let latency = error.is_none().then(|| start.elapsed());

        match (self.record(error.is_none()), &error) {
            (Some(HealthStatus::Healthy), _) => {
                info!("Master server is healthy (latency: {:?})", latency.unwrap_or_default());
            }
            (Some(status), Some(e)) => warn!("Master server is {}: {}", status, e),
            _ => debug!("Health check {:?}: {:?}", http_status, error),
        }

        HealthCheckResult {
            status: self.current_status,
            http_status,
            latency,
            error,
        }
    }

    /// Check on every interval tick and publish status changes to `status_tx`.
    ///
    /// Returns once every receiver has been dropped. The future borrows the
    /// client, so run it on the client's thread (`join!` or a `LocalSet`).
    pub async fn watch<T: Transport>(
        mut self,
        client: &PadroneClient<T>,
        status_tx: watch::Sender<HealthStatus>,
    ) {
        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !status_tx.is_closed() {
            ticker.tick().await;

            let status = self.check(client).await.status;
            status_tx.send_if_modified(|current| {
                if *current == status {
                    return false;
                }
                *current = status;
                true
            });
        }
        debug!("Health monitor stopped, no receivers left");
    }
}
