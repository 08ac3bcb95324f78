//! # Tunnel Audit
//!
//! Implements the one use case swanwatch has: list the child SAs of a connection,
//! probe each remote endpoint, write the report, and tear down whatever is offline.
//!
//! The pipeline only talks to the outside world through [`TunnelInventory`],
//! [`Prober`] and [`TunnelTerminator`], so it can be driven end to end without a
//! firewall.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use swanwatch_common::config::{Config, RunOptions};
use swanwatch_common::error::{AuditError, DerivationError};
use swanwatch_common::tunnel::{NumberedTunnel, RawTunnelRecord, Status, TunnelStatus};
use tracing::info;

use crate::fanout::{self, default_concurrency};
use crate::inventory::TunnelInventory;
use crate::normalizer;
use crate::prober::Prober;
use crate::remediation::{self, RemediationReport, TunnelTerminator};
use crate::report;

#[derive(Debug)]
pub struct AuditSummary {
    /// One status per tunnel, in tunnel order.
    pub statuses: Vec<TunnelStatus>,
    pub report_path: PathBuf,
    /// `None` when remediation was skipped, either by request or because nothing was
    /// offline.
    pub remediation: Option<RemediationReport>,
    pub elapsed: Duration,
}

impl AuditSummary {
    pub fn online(&self) -> usize {
        self.count(Status::On)
    }

    pub fn offline(&self) -> usize {
        self.count(Status::Off)
    }

    fn count(&self, status: Status) -> usize {
        self.statuses.iter().filter(|s| s.status == status).count()
    }
}

/// Normalizes raw rows and orders them by tunnel number.
pub fn numbered_tunnels(
    records: &[RawTunnelRecord],
) -> Result<Vec<NumberedTunnel>, DerivationError> {
    let identities = records.iter().map(normalizer::normalize).collect();
    normalizer::sort_by_number(identities)
}

/// Runs a complete audit.
///
/// Inventory, derivation and report failures end the run. Probe failures show up as
/// `OFF` rows and remediation failures are collected in the summary.
pub async fn run_audit(
    cfg: &Config,
    options: RunOptions,
    inventory: &dyn TunnelInventory,
    prober: &Prober,
    terminator: &mut dyn TunnelTerminator,
) -> Result<AuditSummary, AuditError> {
    let started = Instant::now();

    let records: Vec<RawTunnelRecord> = inventory.child_sas().await?;
    let tunnels: Vec<NumberedTunnel> = numbered_tunnels(&records)?;

    let limit: usize = cfg.probe.max_concurrency.unwrap_or_else(default_concurrency);
    info!("Probing {} tunnels, up to {limit} at a time", tunnels.len());
    let statuses: Vec<TunnelStatus> = fanout::probe_all(prober, &tunnels, limit).await;

    report::write_report(&cfg.output_path, &statuses)?;

    let has_offline = statuses.iter().any(TunnelStatus::is_offline);
    let remediation = match (options.remediate, has_offline) {
        (true, true) => Some(remediation::remediate(terminator, &statuses).await),
        (false, true) => {
            info!("Remediation disabled, leaving offline tunnels untouched");
            None
        }
        (_, false) => None,
    };

    Ok(AuditSummary {
        statuses,
        report_path: cfg.output_path.clone(),
        remediation,
        elapsed: started.elapsed(),
    })
}
