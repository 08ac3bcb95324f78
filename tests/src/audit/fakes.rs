//! In-memory stand-ins for the firewall, the network and the SSH session.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use swanwatch_common::config::Config;
use swanwatch_common::error::{InventoryError, RemediationError};
use swanwatch_common::tunnel::RawTunnelRecord;
use swanwatch_core::inventory::TunnelInventory;
use swanwatch_core::prober::{Prober, Reachability};
use swanwatch_core::remediation::TunnelTerminator;

pub fn record(uuid: &str, description: &str, remote_ts: &str) -> RawTunnelRecord {
    RawTunnelRecord {
        uuid: Some(uuid.to_string()),
        description: Some(description.to_string()),
        remote_ts: Some(remote_ts.to_string()),
    }
}

pub fn config(output_path: &Path) -> Config {
    serde_json::from_value(serde_json::json!({
        "firewall_ip": "192.0.2.1",
        "web_port": 4443,
        "api_key": "key",
        "api_secret": "secret",
        "cert_path": "ca.pem",
        "connection_uuid": "conn-1",
        "ssh_user": "root",
        "ssh_key_path": "id_ed25519",
        "output_path": output_path,
        "probe": { "attempts": 1, "timeout_ms": 100, "max_concurrency": 4 }
    }))
    .unwrap()
}

pub enum FakeInventory {
    Rows(Vec<RawTunnelRecord>),
    Unauthorized,
}

#[async_trait]
impl TunnelInventory for FakeInventory {
    async fn child_sas(&self) -> Result<Vec<RawTunnelRecord>, InventoryError> {
        match self {
            Self::Rows(rows) => Ok(rows.clone()),
            Self::Unauthorized => Err(InventoryError::Status {
                url: "https://192.0.2.1:4443/api/ipsec/connections/search_child".to_string(),
                status: 401,
            }),
        }
    }
}

/// Answers from a fixed set of live addresses and counts every probe.
#[derive(Default)]
pub struct FakeNetwork {
    live: HashSet<String>,
    probes: Mutex<HashMap<String, usize>>,
}

impl FakeNetwork {
    pub fn with_live(addresses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            live: addresses.iter().map(|a| a.to_string()).collect(),
            probes: Mutex::default(),
        })
    }

    pub fn probes(&self, address: &str) -> usize {
        self.probes.lock().unwrap().get(address).copied().unwrap_or(0)
    }

    pub fn prober(self: &Arc<Self>) -> Prober {
        Prober::new(self.clone())
    }
}

#[async_trait]
impl Reachability for FakeNetwork {
    async fn is_reachable(&self, address: &str) -> anyhow::Result<bool> {
        *self.probes.lock().unwrap().entry(address.to_string()).or_default() += 1;
        Ok(self.live.contains(address))
    }
}

#[derive(Default)]
pub struct RecordingTerminator {
    pub terminated: Vec<String>,
    pub refuse: HashSet<String>,
    pub closed: bool,
}

#[async_trait]
impl TunnelTerminator for RecordingTerminator {
    async fn terminate(&mut self, uuid: &str) -> Result<(), RemediationError> {
        if self.refuse.contains(uuid) {
            return Err(RemediationError::CommandFailed { exit_status: 1 });
        }
        self.terminated.push(uuid.to_string());
        Ok(())
    }

    async fn close(&mut self) {
        self.closed = true;
    }
}
