//! Command implementations
//!
//! Each command resolves its arguments against `AppConfig`, builds the live
//! backend and hands the work to a `Provisioner`.

pub mod delete;
pub mod deploy;
pub mod regions;

use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinHandle;
use tunnelgate_common::BackendKind;

use crate::app::AppContext;
use crate::application::cancel::CancelHandle;
use crate::application::services::aws::{AwsProvisioner, AwsSettings};
use crate::application::services::backend::Backend;
use crate::application::services::hetzner::{HetznerProvisioner, HetznerSettings};
use crate::domain::error::ConfigError;
use crate::infra::assets::EmbeddedAssets;
use crate::infra::aws_cli::AwsCli;
use crate::infra::command_runner::{SSH_EXEC_TIMEOUT, TokioCommandRunner};
use crate::infra::hcloud_cli::HcloudCli;
use crate::infra::ssh::OpenSsh;

/// Environment variable holding the Hetzner Cloud API token.
pub const HCLOUD_TOKEN_ENV: &str = "HCLOUD_TOKEN";

/// Region the AWS session starts in before a request re-scopes it.
const FALLBACK_AWS_REGION: &str = "us-east-1";

/// The backend wired to real CLIs.
pub type LiveBackend = Backend<
    AwsCli<TokioCommandRunner>,
    HcloudCli<TokioCommandRunner>,
    OpenSsh<TokioCommandRunner>,
    EmbeddedAssets,
>;

/// Builds the provisioner for `kind` from configuration and environment.
///
/// # Errors
///
/// Returns [`ConfigError::MissingEnv`] when the Hetzner backend is selected
/// without `HCLOUD_TOKEN`.
pub fn build_backend(app: &AppContext, kind: BackendKind) -> Result<LiveBackend> {
    match kind {
        BackendKind::Aws => {
            let region = std::env::var("AWS_REGION")
                .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
                .unwrap_or_else(|_| FALLBACK_AWS_REGION.to_string());
            let settings = AwsSettings {
                qualifier: app.config.aws.qualifier.clone(),
                bootstrap_stack: app.config.aws.bootstrap_stack.clone(),
            };
            let session = AwsCli::new(TokioCommandRunner::default(), region);
            Ok(Backend::Aws(AwsProvisioner::new(session, EmbeddedAssets, settings)))
        }
        BackendKind::Hetzner => {
            let token = std::env::var(HCLOUD_TOKEN_ENV)
                .ok()
                .filter(|t| !t.trim().is_empty())
                .ok_or(ConfigError::MissingEnv(HCLOUD_TOKEN_ENV))?;
            let settings = HetznerSettings {
                image: app.config.hetzner.image.clone(),
                server_type: app.config.hetzner.server_type.clone(),
            };
            Ok(Backend::Hetzner(HetznerProvisioner::new(
                HcloudCli::new(TokioCommandRunner::default(), token),
                OpenSsh::new(TokioCommandRunner::new(SSH_EXEC_TIMEOUT)),
                EmbeddedAssets,
                settings,
            )))
        }
    }
}

/// Fires `handle` on Ctrl-C. Abort the returned task when the command ends.
pub fn cancel_on_interrupt(handle: CancelHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling");
            handle.cancel();
        }
    })
}

/// Fires `handle` once `after` has elapsed.
pub fn cancel_after(handle: CancelHandle, after: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        tracing::warn!(seconds = after.as_secs(), "deadline reached, cancelling");
        handle.cancel();
    })
}

/// Aborts the watcher tasks when dropped.
pub(crate) struct Watchers(Vec<JoinHandle<()>>);

impl Watchers {
    pub(crate) fn new(app: &AppContext, timeout: Option<Duration>) -> Self {
        let mut tasks = vec![cancel_on_interrupt(app.cancel_handle())];
        if let Some(after) = timeout {
            tasks.push(cancel_after(app.cancel_handle(), after));
        }
        Self(tasks)
    }
}

impl Drop for Watchers {
    fn drop(&mut self) {
        for task in &self.0 {
            task.abort();
        }
    }
}
