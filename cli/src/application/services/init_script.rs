//! Renders and runs the WireGuard bootstrap script on the gateway host.

use anyhow::{Context, Result};
use rand::RngCore;

use crate::application::cancel::Cancellation;
use crate::application::ports::{AssetSource, RemoteExecutor};
use crate::domain::error::{RemoteError, is_cancelled};
use crate::domain::init_script::{InitScriptOutcome, InitScriptParams, parse_outcome};
use crate::domain::request::ProvisionRequest;
use crate::domain::template;

pub const INIT_SCRIPT_PATH: &str = "init.sh";

/// A fresh 64-hex-character output separator.
#[must_use]
pub fn new_sentinel() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Configures WireGuard on the host behind `executor` and returns its public key.
///
/// # Errors
///
/// Returns the executor's error (after logging the captured output), or
/// [`RemoteError::MalformedOutput`] if the result trailer cannot be parsed.
pub async fn run_init_script(
    executor: &impl RemoteExecutor,
    assets: &impl AssetSource,
    request: &ProvisionRequest,
    cancel: &Cancellation,
) -> Result<InitScriptOutcome> {
    let params = InitScriptParams {
        sentinel: new_sentinel(),
        port: request.port,
        client_addr: request.client_addr,
        server_addr: request.server_addr,
        client_public_key: request.client_public_key.clone(),
        region: request.region.clone(),
        backend: request.backend,
    };
    let source = assets.read_to_string(INIT_SCRIPT_PATH)?;
    let script = template::render(&source, &params.to_template_params())
        .context("rendering init script")?;

    let output = match executor.run(&script, cancel).await {
        Ok(output) => output,
        Err(e) => {
            if !is_cancelled(&e) {
                if let Some(RemoteError::CommandFailed { stdout, stderr, .. }) =
                    e.downcast_ref::<RemoteError>()
                {
                    tracing::error!(%stdout, %stderr, "init script failed");
                }
            }
            return Err(e.context("running init script"));
        }
    };

    parse_outcome(&output.stdout, &params.sentinel).map_err(|e| {
        tracing::error!(stdout = %output.stdout, stderr = %output.stderr, "init script did not return expected output");
        e.into()
    })
}
