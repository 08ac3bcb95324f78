//! Concurrent probing of every tunnel in a run.
//!
//! All probes are spawned at once and throttled by a semaphore sized to the host's
//! parallelism (or the configured bound). Each task returns its input index together
//! with its verdict and the result lands in the slot for that index, so the output
//! order is the input order no matter which probe finishes first.

use std::num::NonZeroUsize;
use std::sync::Arc;

use swanwatch_common::tunnel::{NumberedTunnel, Status, TunnelStatus};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::prober::Prober;

pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Probes every tunnel and returns one status per tunnel, `result[i]` for
/// `tunnels[i]`. Returns only once every probe has finished.
pub async fn probe_all(
    prober: &Prober,
    tunnels: &[NumberedTunnel],
    max_in_flight: usize,
) -> Vec<TunnelStatus> {
    let permits = Arc::new(Semaphore::new(max_in_flight.max(1)));
    let mut tasks: JoinSet<(usize, TunnelStatus)> = JoinSet::new();

    for (idx, tunnel) in tunnels.iter().cloned().enumerate() {
        let prober = prober.clone();
        let permits = permits.clone();
        tasks.spawn(async move {
            // The semaphore is never closed, so acquiring only waits.
            let _permit = permits.acquire_owned().await;
            (idx, prober.probe(&tunnel).await)
        });
    }

    let mut slots: Vec<Option<TunnelStatus>> = vec![None; tunnels.len()];
    let mut finished: usize = 0;

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((idx, status)) => {
                finished += 1;
                debug!(
                    "[{finished}/{}] tunnel {} is {}",
                    tunnels.len(),
                    status.tunnel_number,
                    status.status
                );
                slots[idx] = Some(status);
            }
            Err(e) => error!("probe task did not finish: {e}"),
        }
    }

    // A slot is only empty if its task panicked or was cancelled.
    slots
        .into_iter()
        .zip(tunnels)
        .map(|(slot, tunnel)| slot.unwrap_or_else(|| TunnelStatus::new(tunnel, Status::Off)))
        .collect()
}
