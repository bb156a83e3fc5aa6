//! `tunnelgate delete`: remove a gateway and everything created for it.

use anyhow::Result;
use clap::Args;
use tunnelgate_common::BackendKind;

use crate::app::AppContext;
use crate::application::cancel::Cancellation;
use crate::application::ports::Provisioner;
use crate::commands::{Watchers, build_backend};
use crate::domain::request::DeprovisionRequest;
use crate::output::progress;

/// Arguments for the delete command.
#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// Region the gateway was deployed to
    #[arg(short, long, env = "TUNNELGATE_REGION")]
    pub region: Option<String>,

    /// Name of the gateway
    #[arg(short, long)]
    pub id: Option<String>,

    /// Cloud backend
    #[arg(short = 't', long = "type", value_enum)]
    pub backend: Option<BackendKind>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Run `tunnelgate delete`.
///
/// # Errors
///
/// Returns an error if the region is missing or any teardown task fails.
pub async fn run(app: &AppContext, args: &DeleteArgs) -> Result<()> {
    let request = DeprovisionRequest {
        backend: args.backend.unwrap_or(app.config.defaults.backend),
        region: args.region.clone().unwrap_or_default(),
    };
    request.validate()?;
    let id = args.id.as_deref().unwrap_or(&app.config.defaults.id);

    app.renderer()
        .render_delete_plan(id, request.backend, &request.region);
    if !app.confirm("Continue?", false)? {
        app.output.info("Cancelled.");
        return Ok(());
    }

    let backend = build_backend(app, request.backend)?;
    let _watchers = Watchers::new(app, None);
    let spinner = app
        .show_spinner()
        .then(|| progress::spinner(&format!("Removing {id}...")));
    let result = execute(&backend, id, &request, app.cancellation()).await;
    if let Some(pb) = &spinner {
        match &result {
            Ok(()) => progress::finish_ok(pb, &format!("Gateway {id} removed")),
            Err(_) => pb.finish_and_clear(),
        }
    }
    result?;
    app.renderer().render_deleted(id)
}

/// Tears `id` down.
///
/// # Errors
///
/// Returns the aggregated teardown error.
pub async fn execute(
    provisioner: &impl Provisioner,
    id: &str,
    request: &DeprovisionRequest,
    cancel: &Cancellation,
) -> Result<()> {
    tracing::info!(%id, backend = %request.backend, region = %request.region, "deprovisioning");
    provisioner.deprovision(id, request, cancel).await
}
