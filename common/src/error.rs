//! # Error taxonomy
//!
//! Each phase of an audit has its own error type. [`AuditError`] wraps them and is
//! the only error a full run can return. Probe failures are deliberately absent:
//! an unreachable tunnel is a result (`OFF`), not an error.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("config key `{0}` is missing or empty")]
    MissingKey(&'static str),
    #[error("config key `{key}` is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Failures talking to the firewall's tunnel inventory API.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("failed to read CA certificate {}: {source}", .path.display())]
    Certificate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid CA certificate {}: {message}", .path.display())]
    InvalidCertificate { path: PathBuf, message: String },
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("unexpected response body from {url}: {message}")]
    Decode { url: String, message: String },
}

/// Raised at the sort boundary when a tunnel number cannot be read as an integer.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("tunnel {uuid:?} ({company:?}) has no usable tunnel number (derived {raw:?})")]
pub struct DerivationError {
    pub uuid: String,
    pub company: String,
    pub raw: String,
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write report to {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Per-tunnel remediation failures. These never abort the remaining attempts.
#[derive(Debug, Error)]
pub enum RemediationError {
    #[error("failed to load ssh key {}: {message}", .path.display())]
    Key { path: PathBuf, message: String },
    #[error("ssh connection to {host} failed: {message}")]
    Connect { host: String, message: String },
    #[error("ssh authentication as {user} was rejected")]
    AuthRejected { user: String },
    #[error("ssh channel error: {0}")]
    Channel(String),
    #[error("refusing to terminate tunnel with unsafe identifier {0:?}")]
    UnsafeIdentifier(String),
    #[error("remote command exited with status {exit_status}")]
    CommandFailed { exit_status: u32 },
    #[error("remote command ended without reporting an exit status")]
    NoExitStatus,
}

#[derive(Debug, Error)]
pub enum AuditError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Inventory(#[from] InventoryError),
    #[error(transparent)]
    Derivation(#[from] DerivationError),
    #[error(transparent)]
    Report(#[from] ReportError),
}
