//! Domain types and validators for tunnelgate configuration.
//!
//! Pure functions only: no I/O, no async, no filesystem access.

use std::net::IpAddr;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tunnelgate_common::BackendKind;

use crate::domain::error::ConfigError;

// ── Constants ────────────────────────────────────────────────────────────────

/// Qualifier used by the asset bucket and bootstrap roles when none is configured.
pub const DEFAULT_QUALIFIER: &str = "hnb659fds";
pub const DEFAULT_BOOTSTRAP_STACK: &str = "tunnelgate-bootstrap";
pub const DEFAULT_PROVISION_ID: &str = "tunnelgate";
pub const DEFAULT_WG_PORT: u16 = 51820;

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.tunnelgate/config.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Values used when the command line does not name them.
    pub defaults: Defaults,
    /// AWS backend settings.
    pub aws: AwsConfig,
    /// Hetzner Cloud backend settings.
    pub hetzner: HetznerConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    pub backend: BackendKind,
    pub id: String,
    pub port: u16,
    pub client_addr: IpAddr,
    pub server_addr: IpAddr,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            backend: BackendKind::Aws,
            id: DEFAULT_PROVISION_ID.to_string(),
            port: DEFAULT_WG_PORT,
            client_addr: IpAddr::from([172, 30, 0, 2]),
            server_addr: IpAddr::from([172, 30, 0, 1]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    /// Asset qualifier baked into bucket and role names of the bootstrap stack.
    pub qualifier: String,
    /// Name of the stack that owns the asset bucket and publishing roles.
    pub bootstrap_stack: String,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            qualifier: DEFAULT_QUALIFIER.to_string(),
            bootstrap_stack: DEFAULT_BOOTSTRAP_STACK.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HetznerConfig {
    pub image: String,
    pub server_type: String,
}

impl Default for HetznerConfig {
    fn default() -> Self {
        Self {
            image: "rocky-9".to_string(),
            server_type: "cx22".to_string(),
        }
    }
}

impl AppConfig {
    /// Apply an explicit qualifier override (from `CDK_CUSTOM_QUALIFIER`).
    ///
    /// # Errors
    ///
    /// Returns an error if the qualifier is not a valid bootstrap qualifier.
    pub fn with_qualifier(mut self, qualifier: Option<&str>) -> Result<Self> {
        if let Some(q) = qualifier.map(str::trim).filter(|q| !q.is_empty()) {
            validate_qualifier(q)?;
            q.clone_into(&mut self.aws.qualifier);
        }
        Ok(self)
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates an asset qualifier: 1-10 lowercase alphanumerics, as accepted by
/// bucket and role names of the bootstrap stack.
///
/// # Errors
///
/// Returns an error if the qualifier is empty, too long, or has other characters.
pub fn validate_qualifier(qualifier: &str) -> Result<()> {
    let valid = !qualifier.is_empty()
        && qualifier.len() <= 10
        && qualifier
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    if !valid {
        return Err(ConfigError::InvalidValue {
            key: "aws.qualifier".to_string(),
            value: qualifier.to_string(),
            valid: "1-10 lowercase letters or digits".to_string(),
        }
        .into());
    }
    Ok(())
}

// ── Unit tests ───────────────────────────────────────────────────────────────
