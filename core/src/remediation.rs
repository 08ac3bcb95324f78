//! Tears down offline tunnels so the firewall renegotiates them.
//!
//! Every `OFF` tunnel gets one `swanctl --terminate --child <uuid>` on the firewall,
//! one after the other over a single SSH session. A failure is recorded against its
//! tunnel and the remaining tunnels are still attempted.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client;
use russh::keys::key::PrivateKeyWithHashAlg;
use russh::keys::load_secret_key;
use russh::keys::ssh_key::{HashAlg, PublicKey};
use russh::{ChannelMsg, Disconnect};
use swanwatch_common::config::Config;
use swanwatch_common::error::RemediationError;
use swanwatch_common::tunnel::TunnelStatus;
use tokio::time::timeout;
use tracing::{debug, info, warn};

pub const TERMINATE_CHILD: &str = "swanctl --terminate --child";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Something that can terminate a child SA by its identifier.
#[async_trait]
pub trait TunnelTerminator: Send {
    async fn terminate(&mut self, uuid: &str) -> Result<(), RemediationError>;

    /// Releases whatever the terminator holds open. Called once after the last attempt.
    async fn close(&mut self) {}
}

/// Outcome of one remediation pass.
#[derive(Debug, Default)]
pub struct RemediationReport {
    pub terminated: Vec<String>,
    pub failed: Vec<(String, RemediationError)>,
}

impl RemediationReport {
    pub fn attempted(&self) -> usize {
        self.terminated.len() + self.failed.len()
    }
}

/// Child SA identifiers end up in a remote shell, so only a conservative alphabet is
/// allowed through.
pub fn validate_identifier(uuid: &str) -> Result<(), RemediationError> {
    let safe = !uuid.is_empty()
        && uuid
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if safe {
        Ok(())
    } else {
        Err(RemediationError::UnsafeIdentifier(uuid.to_string()))
    }
}

pub fn terminate_command(uuid: &str) -> Result<String, RemediationError> {
    validate_identifier(uuid)?;
    Ok(format!("{TERMINATE_CHILD} {uuid}"))
}

/// Terminates every offline tunnel in `statuses`, in report order.
pub async fn remediate(
    terminator: &mut dyn TunnelTerminator,
    statuses: &[TunnelStatus],
) -> RemediationReport {
    let mut report = RemediationReport::default();

    for status in statuses.iter().filter(|status| status.is_offline()) {
        let outcome = match validate_identifier(&status.uuid) {
            Ok(()) => terminator.terminate(&status.uuid).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {
                info!("Tunnel {} ({}) terminated", status.tunnel_number, status.company);
                report.terminated.push(status.uuid.clone());
            }
            Err(e) => {
                warn!("Tunnel {} ({}) could not be terminated: {e}", status.tunnel_number, status.company);
                report.failed.push((status.uuid.clone(), e));
            }
        }
    }

    terminator.close().await;
    report
}

/// Accepts the firewall's host key, or pins it when a fingerprint is configured.
struct HostKeyPolicy {
    expected: Option<String>,
}

impl client::Handler for HostKeyPolicy {
    type Error = russh::Error;

    async fn check_server_key(&mut self, server_public_key: &PublicKey) -> Result<bool, Self::Error> {
        let actual: String = server_public_key.fingerprint(HashAlg::Sha256).to_string();
        let accepted = host_key_accepted(self.expected.as_deref(), &actual);
        if !accepted {
            warn!(
                "Host key mismatch: expected {}, got {actual}",
                self.expected.as_deref().unwrap_or_default().trim()
            );
        }
        Ok(accepted)
    }
}

/// Any key passes when no fingerprint is pinned. A pinned fingerprint is compared
/// exactly, ignoring surrounding whitespace in the configured value.
pub fn host_key_accepted(expected: Option<&str>, actual: &str) -> bool {
    match expected {
        None => true,
        Some(expected) => expected.trim() == actual,
    }
}

enum Session {
    Pending,
    Open(client::Handle<HostKeyPolicy>),
    /// Connecting failed once. The reason is replayed for every later tunnel.
    Unavailable(String),
}

/// Runs `swanctl` on the firewall over SSH with public key authentication.
///
/// The session is opened on the first call to [`TunnelTerminator::terminate`], so a
/// run with no offline tunnels never connects.
pub struct SshTerminator {
    host: String,
    port: u16,
    user: String,
    key_path: PathBuf,
    passphrase: Option<String>,
    host_key_fingerprint: Option<String>,
    session: Session,
}

impl SshTerminator {
    pub fn new(cfg: &Config) -> Self {
        Self {
            host: cfg.firewall_ip.clone(),
            port: cfg.ssh_port(),
            user: cfg.ssh_user.clone(),
            key_path: cfg.ssh_key_path.clone(),
            passphrase: cfg.ssh_key_passphrase.clone(),
            host_key_fingerprint: cfg.ssh_host_key_fingerprint.clone(),
            session: Session::Pending,
        }
    }

    async fn connect(&self) -> Result<client::Handle<HostKeyPolicy>, RemediationError> {
        let key = load_secret_key(&self.key_path, self.passphrase.as_deref()).map_err(|e| {
            RemediationError::Key {
                path: self.key_path.clone(),
                message: e.to_string(),
            }
        })?;

        let config = Arc::new(client::Config {
            inactivity_timeout: Some(COMMAND_TIMEOUT),
            ..Default::default()
        });
        let policy = HostKeyPolicy {
            expected: self.host_key_fingerprint.clone(),
        };
        let connect_err = |message: String| RemediationError::Connect {
            host: format!("{}:{}", self.host, self.port),
            message,
        };

        info!("Opening ssh session to {}@{}:{}", self.user, self.host, self.port);
        let mut session = timeout(
            CONNECT_TIMEOUT,
            client::connect(config, (self.host.as_str(), self.port), policy),
        )
        .await
        .map_err(|_| connect_err("timed out".to_string()))?
        .map_err(|e| connect_err(e.to_string()))?;

        let rsa_hash = session
            .best_supported_rsa_hash()
            .await
            .map_err(|e| connect_err(e.to_string()))?
            .flatten();
        let auth = session
            .authenticate_publickey(
                self.user.clone(),
                PrivateKeyWithHashAlg::new(Arc::new(key), rsa_hash),
            )
            .await
            .map_err(|e| connect_err(e.to_string()))?;

        if !auth.success() {
            return Err(RemediationError::AuthRejected {
                user: self.user.clone(),
            });
        }
        Ok(session)
    }

    async fn session(&mut self) -> Result<&client::Handle<HostKeyPolicy>, RemediationError> {
        if matches!(self.session, Session::Pending) {
            self.session = match self.connect().await {
                Ok(handle) => Session::Open(handle),
                Err(e) => {
                    warn!("{e}");
                    Session::Unavailable(e.to_string())
                }
            };
        }

        let reason: &str = match &self.session {
            Session::Open(handle) => return Ok(handle),
            Session::Unavailable(reason) => reason,
            Session::Pending => "not connected",
        };
        Err(RemediationError::Connect {
            host: format!("{}:{}", self.host, self.port),
            message: format!("session unavailable: {reason}"),
        })
    }
}

async fn run_command(
    handle: &client::Handle<HostKeyPolicy>,
    command: &str,
) -> Result<(), RemediationError> {
    let channel_err = |e: russh::Error| RemediationError::Channel(e.to_string());

    let mut channel = handle.channel_open_session().await.map_err(channel_err)?;
    channel.exec(true, command).await.map_err(channel_err)?;

    let mut exit_status: Option<u32> = None;
    let drained = timeout(COMMAND_TIMEOUT, async {
        while let Some(msg) = channel.wait().await {
            if let ChannelMsg::ExitStatus { exit_status: code } = msg {
                exit_status = Some(code);
            }
        }
    })
    .await;

    if drained.is_err() && exit_status.is_none() {
        return Err(RemediationError::Channel(format!(
            "`{command}` did not finish within {}s",
            COMMAND_TIMEOUT.as_secs()
        )));
    }

    match exit_status {
        Some(0) => Ok(()),
        Some(code) => Err(RemediationError::CommandFailed { exit_status: code }),
        None => Err(RemediationError::NoExitStatus),
    }
}

#[async_trait]
impl TunnelTerminator for SshTerminator {
    async fn terminate(&mut self, uuid: &str) -> Result<(), RemediationError> {
        let command: String = terminate_command(uuid)?;
        let handle = self.session().await?;
        debug!("Running `{command}`");
        run_command(handle, &command).await
    }

    async fn close(&mut self) {
        if let Session::Open(handle) = &self.session {
            if let Err(e) = handle
                .disconnect(Disconnect::ByApplication, "", "English")
                .await
            {
                debug!("SSH disconnect failed: {e}");
            }
        }
        self.session = Session::Pending;
    }
}
