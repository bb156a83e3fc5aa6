use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cloud backend a gateway is provisioned on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Aws,
    Hetzner,
}

impl BackendKind {
    /// Name used on the command line, in config files and in the bootstrap script.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Aws => "aws",
            BackendKind::Hetzner => "hetzner",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown backend type: {0} (expected one of: aws, hetzner)")]
pub struct UnknownBackend(pub String);

impl FromStr for BackendKind {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aws" => Ok(BackendKind::Aws),
            "hetzner" => Ok(BackendKind::Hetzner),
            _ => Err(UnknownBackend(s.to_string())),
        }
    }
}

/// A selectable deployment region.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    /// Backend-native region id, e.g. `eu-central-1` or `fsn1`.
    pub key: String,
    pub city: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Outcome of a successful provisioning run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProvisionResult {
    /// Public IP of the gateway host.
    pub server_ip: IpAddr,
    /// Tunnel address of the gateway inside the WireGuard network.
    pub server_addr: IpAddr,
    /// WireGuard public key generated on the gateway.
    pub server_public_key: String,
}
