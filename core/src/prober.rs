//! Reachability probing for a single tunnel.
//!
//! [`Reachability`] is the seam to the network: the production implementation shells
//! out to the system `ping`, tests plug in scripted answers. [`Prober`] wraps it and
//! turns every possible outcome into an `ON`/`OFF` verdict.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use swanwatch_common::config::ProbeConfig;
use swanwatch_common::tunnel::{NumberedTunnel, Status, TunnelStatus};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// Slack on top of the computed run time before a ping is killed.
const PING_GRACE: Duration = Duration::from_secs(1);

/// Gap every platform's `ping` leaves between echo requests.
const PING_INTERVAL: Duration = Duration::from_secs(1);

/// Answers whether an address responds. Errors are treated as "no" by [`Prober`].
#[async_trait]
pub trait Reachability: Send + Sync {
    async fn is_reachable(&self, address: &str) -> anyhow::Result<bool>;
}

/// ICMP echo through the host's `ping` binary.
#[derive(Debug, Clone)]
pub struct PingReachability {
    program: PathBuf,
    attempts: u8,
    per_attempt: Duration,
}

impl PingReachability {
    pub fn new(attempts: u8, per_attempt: Duration) -> Self {
        Self {
            program: PathBuf::from("ping"),
            attempts: attempts.max(1),
            per_attempt,
        }
    }

    pub fn from_config(probe: &ProbeConfig) -> Self {
        Self::new(probe.attempts, probe.timeout())
    }

    /// Runs `program` instead of the `ping` found on `PATH`. It receives the same
    /// arguments.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Hard ceiling for one invocation.
    ///
    /// Each echo request may wait a full interval plus its reply wait before the next
    /// one goes out, and the reply wait is the one `ping` is actually given.
    pub fn deadline(&self) -> Duration {
        (PING_INTERVAL + reply_wait(self.per_attempt)) * u32::from(self.attempts) + PING_GRACE
    }

    fn args(&self) -> Vec<String> {
        ping_args(self.attempts, self.per_attempt)
    }
}

#[cfg(any(target_os = "windows", target_os = "macos"))]
fn reply_wait(per_attempt: Duration) -> Duration {
    per_attempt.max(Duration::from_millis(1))
}

// iputils and busybox take whole seconds
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn reply_wait(per_attempt: Duration) -> Duration {
    let secs = per_attempt.as_millis().div_ceil(1_000).max(1);
    Duration::from_secs(u64::try_from(secs).unwrap_or(u64::MAX))
}

#[cfg(target_os = "windows")]
fn ping_args(attempts: u8, per_attempt: Duration) -> Vec<String> {
    vec![
        "-n".to_string(),
        attempts.to_string(),
        "-w".to_string(),
        reply_wait(per_attempt).as_millis().to_string(),
    ]
}

#[cfg(target_os = "macos")]
fn ping_args(attempts: u8, per_attempt: Duration) -> Vec<String> {
    vec![
        "-c".to_string(),
        attempts.to_string(),
        "-W".to_string(),
        reply_wait(per_attempt).as_millis().to_string(),
    ]
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn ping_args(attempts: u8, per_attempt: Duration) -> Vec<String> {
    vec![
        "-c".to_string(),
        attempts.to_string(),
        "-W".to_string(),
        reply_wait(per_attempt).as_secs().to_string(),
    ]
}

/// Rejects anything `ping` could read as an option instead of a host.
fn is_probeable(address: &str) -> bool {
    !address.is_empty()
        && !address.starts_with('-')
        && !address.chars().any(|c| c.is_whitespace() || c.is_control())
}

#[async_trait]
impl Reachability for PingReachability {
    async fn is_reachable(&self, address: &str) -> anyhow::Result<bool> {
        anyhow::ensure!(is_probeable(address), "{address:?} is not a probeable address");

        let mut command = Command::new(&self.program);
        command
            .args(self.args())
            .arg(address)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true);

        let status = timeout(self.deadline(), command.status())
            .await
            .map_err(|_| anyhow::anyhow!("ping {address} timed out"))??;

        Ok(status.success())
    }
}

/// Produces a [`TunnelStatus`] for a tunnel. Never fails.
#[derive(Clone)]
pub struct Prober {
    reachability: Arc<dyn Reachability>,
}

impl Prober {
    pub fn new(reachability: Arc<dyn Reachability>) -> Self {
        Self { reachability }
    }

    /// A prober backed by the system `ping`, tuned from the config.
    pub fn ping(probe: &ProbeConfig) -> Self {
        Self::new(Arc::new(PingReachability::from_config(probe)))
    }

    pub async fn probe(&self, tunnel: &NumberedTunnel) -> TunnelStatus {
        let address: &str = &tunnel.identity.address;
        let reachable = match self.reachability.is_reachable(address).await {
            Ok(reachable) => reachable,
            Err(e) => {
                debug!("tunnel {} probe failed: {e:#}", tunnel.number);
                false
            }
        };
        TunnelStatus::new(tunnel, Status::from_reachable(reachable))
    }
}
