//! # Run configuration
//!
//! A single JSON document describes the firewall, its API credentials, the SSH
//! management channel and where to write the report:
//!
//! ```json
//! {
//!     "firewall_ip": "192.0.2.1",
//!     "web_port": 4443,
//!     "api_key": "key",
//!     "api_secret": "secret",
//!     "cert_path": "firewall-ca.pem",
//!     "connection_uuid": "8d3c6a0e-3f3b-4b8f-9d8c-2b1f0a6c9e11",
//!     "ssh_port": 22,
//!     "ssh_user": "root",
//!     "ssh_key_path": "id_ed25519",
//!     "output_path": "tunnels.json",
//!     "probe": { "attempts": 3, "timeout_ms": 1000, "max_concurrency": 16 }
//! }
//! ```
//!
//! The loaded [`Config`] is passed by reference to every component that needs it.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_SSH_PORT: u16 = 22;
pub const DEFAULT_PROBE_ATTEMPTS: u8 = 3;
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 1_000;
pub const MAX_PROBE_ATTEMPTS: u8 = 10;

#[derive(Clone, Deserialize)]
pub struct Config {
    /// Management address of the firewall, used for both the API and SSH.
    #[serde(default)]
    pub firewall_ip: String,
    /// HTTPS port of the web API.
    pub web_port: Option<u16>,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    /// PEM file holding the CA (or self-signed certificate) the API must present.
    #[serde(default)]
    pub cert_path: PathBuf,
    /// IPsec connection whose child SAs are audited.
    #[serde(default)]
    pub connection_uuid: String,
    pub ssh_port: Option<u16>,
    #[serde(default)]
    pub ssh_user: String,
    #[serde(default)]
    pub ssh_key_path: PathBuf,
    pub ssh_key_passphrase: Option<String>,
    /// OpenSSH style `SHA256:...` fingerprint. Any host key is accepted when unset.
    pub ssh_host_key_fingerprint: Option<String>,
    #[serde(default)]
    pub output_path: PathBuf,
    #[serde(default)]
    pub probe: ProbeConfig,
}

/// Reachability probe tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "default_attempts")]
    pub attempts: u8,
    /// Per echo request.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Upper bound on in-flight probes. Defaults to the host's available parallelism.
    pub max_concurrency: Option<usize>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_PROBE_ATTEMPTS,
            timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            max_concurrency: None,
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_attempts() -> u8 {
    DEFAULT_PROBE_ATTEMPTS
}

fn default_timeout_ms() -> u64 {
    DEFAULT_PROBE_TIMEOUT_MS
}

/// Switches that come from the command line rather than the config file.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Terminate offline tunnels after writing the report.
    pub remediate: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self { remediate: true }
    }
}

impl Config {
    /// Reads, parses and validates the config file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let cfg = Self::read(path)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reads and parses without validating, for callers that still want to apply
    /// overrides before [`Config::validate`].
    pub fn read(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: Config = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(cfg)
    }

    /// Checks that every key needed for a run is present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require("firewall_ip", &self.firewall_ip)?;
        if self.web_port.is_none() {
            return Err(ConfigError::MissingKey("web_port"));
        }
        require("api_key", &self.api_key)?;
        require("api_secret", &self.api_secret)?;
        require_path("cert_path", &self.cert_path)?;
        require("connection_uuid", &self.connection_uuid)?;
        require("ssh_user", &self.ssh_user)?;
        require_path("ssh_key_path", &self.ssh_key_path)?;
        require_path("output_path", &self.output_path)?;

        if !(1..=MAX_PROBE_ATTEMPTS).contains(&self.probe.attempts) {
            return Err(ConfigError::Invalid {
                key: "probe.attempts",
                reason: format!("must be between 1 and {MAX_PROBE_ATTEMPTS}"),
            });
        }
        if self.probe.timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "probe.timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.probe.max_concurrency == Some(0) {
            return Err(ConfigError::Invalid {
                key: "probe.max_concurrency",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// `https://<firewall_ip>:<web_port>`, without a trailing slash.
    pub fn api_base_url(&self) -> String {
        let port = self.web_port.unwrap_or(443);
        format!("https://{}:{}", self.firewall_ip, port)
    }

    pub fn ssh_port(&self) -> u16 {
        self.ssh_port.unwrap_or(DEFAULT_SSH_PORT)
    }
}

fn require(key: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingKey(key));
    }
    Ok(())
}

fn require_path(key: &'static str, value: &Path) -> Result<(), ConfigError> {
    if value.as_os_str().is_empty() {
        return Err(ConfigError::MissingKey(key));
    }
    Ok(())
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("firewall_ip", &self.firewall_ip)
            .field("web_port", &self.web_port)
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .field("cert_path", &self.cert_path)
            .field("connection_uuid", &self.connection_uuid)
            .field("ssh_port", &self.ssh_port)
            .field("ssh_user", &self.ssh_user)
            .field("ssh_key_path", &self.ssh_key_path)
            .field("ssh_host_key_fingerprint", &self.ssh_host_key_fingerprint)
            .field("output_path", &self.output_path)
            .field("probe", &self.probe)
            .finish_non_exhaustive()
    }
}
