//! Provisioning requests and their validation.

use std::net::IpAddr;

use anyhow::Result;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tunnelgate_common::BackendKind;

use crate::domain::error::ConfigError;

const WG_KEY_LEN: usize = 44;
const WG_KEY_BYTES: usize = 32;

/// Desired gateway configuration for one `deploy` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionRequest {
    pub client_public_key: String,
    pub client_addr: IpAddr,
    pub server_addr: IpAddr,
    pub port: u16,
    pub backend: BackendKind,
    pub region: String,
}

impl ProvisionRequest {
    /// Checks the request invariants before any remote call is made.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a malformed key, address, port
    /// or region, and [`ConfigError::MissingRegion`] for an empty region.
    pub fn validate(&self) -> Result<()> {
        validate_public_key(&self.client_public_key)?;
        validate_host_addr("client address", self.client_addr)?;
        validate_host_addr("server address", self.server_addr)?;
        if self.client_addr == self.server_addr {
            return Err(invalid(
                "server address",
                &self.server_addr.to_string(),
                "an address different from the client address",
            )
            .into());
        }
        if self.port == 0 {
            return Err(invalid("port", "0", "1-65535").into());
        }
        validate_region(&self.region)
    }
}

/// Teardown target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeprovisionRequest {
    pub backend: BackendKind,
    pub region: String,
}

impl DeprovisionRequest {
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRegion`] for an empty region and
    /// [`ConfigError::InvalidValue`] for one outside `[a-z0-9-]`.
    pub fn validate(&self) -> Result<()> {
        validate_region(&self.region)
    }
}

/// A WireGuard public key: standard base64 of exactly 32 bytes.
fn validate_public_key(key: &str) -> Result<()> {
    let decodes = key.len() == WG_KEY_LEN
        && STANDARD
            .decode(key)
            .is_ok_and(|bytes| bytes.len() == WG_KEY_BYTES);
    if !decodes {
        return Err(invalid(
            "client public key",
            key,
            "a base64 WireGuard public key (44 characters)",
        )
        .into());
    }
    Ok(())
}

/// Region and location keys are lowercase letters, digits and `-`.
fn validate_region(region: &str) -> Result<()> {
    if region.trim().is_empty() {
        return Err(ConfigError::MissingRegion.into());
    }
    let valid = region
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !valid {
        return Err(invalid("region", region, "lowercase letters, digits and '-'").into());
    }
    Ok(())
}

/// Tunnel addresses must name a single host.
fn validate_host_addr(key: &str, addr: IpAddr) -> Result<()> {
    let usable = !addr.is_unspecified()
        && !addr.is_multicast()
        && !matches!(addr, IpAddr::V4(v4) if v4.is_broadcast());
    if !usable {
        return Err(invalid(key, &addr.to_string(), "a unicast host address").into());
    }
    Ok(())
}

fn invalid(key: &str, value: &str, valid: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        valid: valid.to_string(),
    }
}
