//! Turns raw `search_child` rows into [`TunnelIdentity`] values and puts them in
//! tunnel order.
//!
//! Normalization is best effort over free text and never fails. The one hard check is
//! deferred to [`sort_by_number`]: a tunnel that cannot be numbered cannot be ordered,
//! and the run stops there instead of guessing.

use swanwatch_common::error::DerivationError;
use swanwatch_common::tunnel::{NumberedTunnel, RawTunnelRecord, TunnelIdentity, TunnelNumber};

/// Separator between company and address in a child SA description.
pub const DESCRIPTION_SEPARATOR: &str = " - ";

/// Index of the octet in the remote address that carries the tunnel number.
const TUNNEL_OCTET: usize = 2;

pub fn normalize(raw: &RawTunnelRecord) -> TunnelIdentity {
    let description: &str = raw.description.as_deref().unwrap_or_default();
    let remote_ts: &str = raw.remote_ts.as_deref().unwrap_or_default();
    let (company, address) = split_description(description);

    TunnelIdentity {
        tunnel_number: TunnelNumber::from_octet(derive_tunnel_number(remote_ts)),
        company: company.to_string(),
        address: address.to_string(),
        uuid: raw.uuid.clone().unwrap_or_default(),
    }
}

/// Splits `"Company - Address"` on the first separator. Without a separator the whole
/// trimmed text is the company and the address is empty.
pub fn split_description(description: &str) -> (&str, &str) {
    match description.split_once(DESCRIPTION_SEPARATOR) {
        Some((company, address)) => (company.trim(), address.trim()),
        None => (description.trim(), ""),
    }
}

/// Returns the third octet of the address in a traffic selector such as
/// `10.20.33.5/32`, or `""` when the address has fewer than three octets.
pub fn derive_tunnel_number(remote_ts: &str) -> &str {
    let address: &str = remote_ts.split('/').next().unwrap_or_default();
    address.split('.').nth(TUNNEL_OCTET).unwrap_or_default()
}

/// Orders identities by tunnel number, ascending.
///
/// Fails on the first identity whose number is not an integer. Equal numbers keep
/// their API order.
pub fn sort_by_number(
    identities: Vec<TunnelIdentity>,
) -> Result<Vec<NumberedTunnel>, DerivationError> {
    let mut tunnels: Vec<NumberedTunnel> = identities
        .into_iter()
        .map(|identity| match identity.tunnel_number.value() {
            Some(number) => Ok(NumberedTunnel { number, identity }),
            None => Err(DerivationError {
                raw: identity.tunnel_number.to_string(),
                uuid: identity.uuid,
                company: identity.company,
            }),
        })
        .collect::<Result<_, _>>()?;

    tunnels.sort_by_key(|tunnel| tunnel.number);
    Ok(tunnels)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
