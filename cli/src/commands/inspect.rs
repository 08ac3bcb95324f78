use swanwatch_common::config::Config;
use swanwatch_common::tunnel::{RawTunnelRecord, TunnelIdentity};
use swanwatch_core::inventory::InventoryClient;
use swanwatch_core::normalizer;
use tracing::{info, warn};

use crate::terminal::{format, print};

/// Prints the normalized tunnels in API order, flagging the ones an audit would
/// refuse to sort.
pub async fn inspect(cfg: &Config, q_level: u8) -> anyhow::Result<()> {
    let inventory = InventoryClient::new(cfg)?;
    let records: Vec<RawTunnelRecord> = inventory.search_child().await?;
    let identities: Vec<TunnelIdentity> = records.iter().map(normalizer::normalize).collect();

    if identities.is_empty() {
        print::no_results();
        return Ok(());
    }

    if q_level < 2 {
        for (idx, identity) in identities.iter().enumerate() {
            print::tree_head(idx, &identity.company);
            print::as_tree_one_level(format::identity_details(identity));
            if idx + 1 != identities.len() {
                print::blank();
            }
        }
    }

    let unnumbered: usize = identities
        .iter()
        .filter(|identity| identity.tunnel_number.value().is_none())
        .count();
    match unnumbered {
        0 => info!("{} tunnels, all numbered", identities.len()),
        n => warn!("{n} of {} tunnels have no usable tunnel number; an audit would stop", identities.len()),
    }
    Ok(())
}
