//! Hetzner Cloud resource shapes as exchanged with `hcloud -o json`.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use tunnelgate_common::Location;

pub const SSH_PORT: u16 = 22;

/// One inbound firewall rule, in the `--rules-file` format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallRule {
    pub direction: String,
    pub source_ips: Vec<String>,
    pub protocol: String,
    pub port: String,
    pub description: String,
}

impl FirewallRule {
    fn inbound_from_anywhere(protocol: &str, port: u16, description: &str) -> Self {
        Self {
            direction: "in".to_string(),
            source_ips: vec!["0.0.0.0/0".to_string(), "::/0".to_string()],
            protocol: protocol.to_string(),
            port: port.to_string(),
            description: description.to_string(),
        }
    }
}

/// The complete rule set of a gateway firewall: WireGuard and SSH in, from anywhere.
#[must_use]
pub fn gateway_firewall_rules(wg_port: u16) -> Vec<FirewallRule> {
    vec![
        FirewallRule::inbound_from_anywhere("udp", wg_port, "Wireguard"),
        FirewallRule::inbound_from_anywhere("tcp", SSH_PORT, "SSH"),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerRecord {
    pub id: u64,
    pub name: String,
    pub status: String,
    pub public_net: PublicNet,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PublicNet {
    pub ipv4: Option<Ipv4Record>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Ipv4Record {
    pub ip: IpAddr,
}

impl ServerRecord {
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status == "running"
    }

    #[must_use]
    pub fn public_ipv4(&self) -> Option<IpAddr> {
        self.public_net.ipv4.as_ref().map(|v4| v4.ip)
    }
}

/// Subset of `hcloud ssh-key` / `hcloud firewall` output used for lookups.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NamedResource {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationRecord {
    pub name: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

impl From<LocationRecord> for Location {
    fn from(record: LocationRecord) -> Self {
        Location {
            key: record.name,
            city: record.city,
            country: record.country,
            latitude: record.latitude,
            longitude: record.longitude,
        }
    }
}
