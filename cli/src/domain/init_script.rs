//! Bootstrap script parameters and the sentinel-delimited result channel.
//!
//! The remote script prints free text, then the sentinel exactly once,
//! immediately followed by one JSON object. [`parse_outcome`] is the only
//! place that knows this framing.

use std::collections::BTreeMap;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use tunnelgate_common::BackendKind;

use crate::domain::error::RemoteError;

/// Structured result printed after the sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitScriptOutcome {
    #[serde(rename = "ServerWgPublicKey")]
    pub server_wg_public_key: String,
}

/// Values the bootstrap script is rendered with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitScriptParams {
    pub sentinel: String,
    pub port: u16,
    pub client_addr: IpAddr,
    pub server_addr: IpAddr,
    pub client_public_key: String,
    pub region: String,
    pub backend: BackendKind,
}

impl InitScriptParams {
    /// Flat template parameter map, keyed by the names used in `init.sh`.
    #[must_use]
    pub fn to_template_params(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("OutputSeparator".to_string(), self.sentinel.clone()),
            ("WgPort".to_string(), self.port.to_string()),
            ("ClientWgIp".to_string(), self.client_addr.to_string()),
            ("ServerWgIp".to_string(), self.server_addr.to_string()),
            ("ClientPublicKey".to_string(), self.client_public_key.clone()),
            ("Region".to_string(), self.region.clone()),
            ("Type".to_string(), self.backend.as_str().to_string()),
        ])
    }
}

/// Splits `stdout` on `sentinel` and decodes the trailer.
///
/// # Errors
///
/// Returns [`RemoteError::MalformedOutput`] if the sentinel does not occur
/// exactly once or the trailer is not a matching JSON object.
pub fn parse_outcome(stdout: &str, sentinel: &str) -> Result<InitScriptOutcome, RemoteError> {
    if sentinel.is_empty() {
        return Err(RemoteError::MalformedOutput("empty sentinel".to_string()));
    }
    let occurrences = stdout.matches(sentinel).count();
    if occurrences != 1 {
        return Err(RemoteError::MalformedOutput(format!(
            "expected the output separator exactly once, found it {occurrences} times"
        )));
    }
    let trailer = stdout
        .split_once(sentinel)
        .map(|(_, after)| after)
        .unwrap_or_default();
    serde_json::from_str(trailer.trim())
        .map_err(|e| RemoteError::MalformedOutput(format!("invalid result JSON: {e}")))
}
