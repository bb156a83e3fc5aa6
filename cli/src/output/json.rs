//! JSON output helpers.
//!
//! `--json` prints one pretty-printed object per command on stdout, and the
//! error object below when a command fails.

use anyhow::{Context, Result};
use tunnelgate_common::{Location, ProvisionResult};

use crate::domain::error::{
    AssetError, ConfigError, RemoteError, StackError, TeardownError, is_cancelled,
};

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Stable machine-readable code for the first typed error in the chain.
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    if is_cancelled(err) {
        return "CANCELLED";
    }
    for cause in err.chain() {
        if cause.is::<ConfigError>() {
            return "CONFIG_ERROR";
        }
        if cause.is::<StackError>() {
            return "STACK_ERROR";
        }
        if cause.is::<RemoteError>() {
            return "REMOTE_ERROR";
        }
        if cause.is::<AssetError>() {
            return "ASSET_ERROR";
        }
        if cause.is::<TeardownError>() {
            return "TEARDOWN_ERROR";
        }
    }
    "ERROR"
}

/// Renders command results as JSON on stdout.
pub struct JsonRenderer;

impl JsonRenderer {
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_deployment(&self, result: &ProvisionResult, port: u16) -> Result<()> {
        let obj = serde_json::json!({
            "server_ip": result.server_ip,
            "server_addr": result.server_addr,
            "server_public_key": result.server_public_key,
            "port": port,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&obj).context("JSON serialization failed")?
        );
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_deleted(&self, id: &str) -> Result<()> {
        let obj = serde_json::json!({ "deleted": id });
        println!(
            "{}",
            serde_json::to_string_pretty(&obj).context("JSON serialization failed")?
        );
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_locations(&self, locations: &[Location]) -> Result<()> {
        println!(
            "{}",
            serde_json::to_string_pretty(locations).context("JSON serialization failed")?
        );
        Ok(())
    }
}
