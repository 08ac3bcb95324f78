//! # Tunnel Model
//!
//! The three shapes a child SA passes through during an audit:
//!
//! * [`RawTunnelRecord`]: one row of the firewall's `search_child` response, as lenient
//!   as the API itself.
//! * [`TunnelIdentity`]: the normalized identity, possibly with an unusable
//!   [`TunnelNumber`].
//! * [`TunnelStatus`]: the probe verdict, which is also the report row.
//!
//! [`NumberedTunnel`] sits between the last two. It only exists for identities whose
//! tunnel number parsed, so anything that takes one can rely on the integer.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// One row from the inventory API. Fields that are missing, `null` or not strings
/// all deserialize to `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawTunnelRecord {
    #[serde(default, deserialize_with = "lenient_text")]
    pub uuid: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub remote_ts: Option<String>,
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(text) => Some(text),
        _ => None,
    })
}

/// The tunnel number as derived from the remote traffic selector.
///
/// Derivation never fails; a selector that yields no integer is kept as
/// [`TunnelNumber::Unparseable`] with whatever text was found (possibly empty), and
/// only becomes an error when someone needs the integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TunnelNumber {
    Parsed(u32),
    Unparseable(String),
}

impl TunnelNumber {
    /// Surrounding whitespace is ignored, the rest must be a decimal integer.
    pub fn from_octet(raw: &str) -> Self {
        match raw.trim().parse::<u32>() {
            Ok(number) => Self::Parsed(number),
            Err(_) => Self::Unparseable(raw.to_string()),
        }
    }

    pub fn value(&self) -> Option<u32> {
        match self {
            Self::Parsed(number) => Some(*number),
            Self::Unparseable(_) => None,
        }
    }
}

impl fmt::Display for TunnelNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parsed(number) => write!(f, "{number}"),
            Self::Unparseable(raw) => f.write_str(raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelIdentity {
    pub tunnel_number: TunnelNumber,
    pub company: String,
    /// Address to probe. Empty when the description carried none.
    pub address: String,
    pub uuid: String,
}

/// An identity whose tunnel number is known to be an integer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberedTunnel {
    pub number: u32,
    pub identity: TunnelIdentity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "ON")]
    On,
    #[serde(rename = "OFF")]
    Off,
}

impl Status {
    pub fn from_reachable(reachable: bool) -> Self {
        if reachable { Self::On } else { Self::Off }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::On => f.write_str("ON"),
            Self::Off => f.write_str("OFF"),
        }
    }
}

/// Probe verdict for one tunnel. The serialized field names are what downstream
/// consumers of the report read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelStatus {
    #[serde(rename = "tunel")]
    pub tunnel_number: u32,
    #[serde(rename = "empresa")]
    pub company: String,
    pub status: Status,
    pub uuid: String,
}

impl TunnelStatus {
    pub fn new(tunnel: &NumberedTunnel, status: Status) -> Self {
        Self {
            tunnel_number: tunnel.number,
            company: tunnel.identity.company.clone(),
            status,
            uuid: tunnel.identity.uuid.clone(),
        }
    }

    pub fn is_offline(&self) -> bool {
        self.status == Status::Off
    }
}
