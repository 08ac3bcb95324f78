use colored::*;
use swanwatch_common::tunnel::{Status, TunnelIdentity, TunnelNumber, TunnelStatus};

use crate::terminal::colors;

pub type Detail = (String, ColoredString);

pub fn status_to_detail(status: Status) -> Detail {
    let value: ColoredString = match status {
        Status::On => "ON".color(colors::ONLINE).bold(),
        Status::Off => "OFF".color(colors::OFFLINE).bold(),
    };
    ("Status".to_string(), value)
}

pub fn number_to_detail(number: &TunnelNumber) -> Detail {
    let value: ColoredString = match number {
        TunnelNumber::Parsed(n) => n.to_string().color(colors::TUNNEL_NUMBER),
        TunnelNumber::Unparseable(raw) if raw.is_empty() => "missing".color(colors::OFFLINE),
        TunnelNumber::Unparseable(raw) => format!("{raw:?}").color(colors::OFFLINE),
    };
    ("Tunnel".to_string(), value)
}

pub fn uuid_to_detail(uuid: &str) -> Detail {
    let value: ColoredString = if uuid.is_empty() {
        "none".dimmed()
    } else {
        uuid.color(colors::UUID)
    };
    ("UUID".to_string(), value)
}

pub fn address_to_detail(address: &str) -> Detail {
    let value: ColoredString = if address.is_empty() {
        "none".dimmed()
    } else {
        address.color(colors::TEXT_DEFAULT)
    };
    ("Address".to_string(), value)
}

pub fn status_details(status: &TunnelStatus) -> Vec<Detail> {
    vec![
        (
            "Tunnel".to_string(),
            status.tunnel_number.to_string().color(colors::TUNNEL_NUMBER),
        ),
        status_to_detail(status.status),
        uuid_to_detail(&status.uuid),
    ]
}

pub fn identity_details(identity: &TunnelIdentity) -> Vec<Detail> {
    vec![
        number_to_detail(&identity.tunnel_number),
        address_to_detail(&identity.address),
        uuid_to_detail(&identity.uuid),
    ]
}
