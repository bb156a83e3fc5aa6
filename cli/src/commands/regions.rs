//! `tunnelgate regions`: list deployable regions.

use anyhow::Result;
use clap::Args;
use tunnelgate_common::BackendKind;

use crate::app::AppContext;
use crate::application::ports::Provisioner;
use crate::commands::{Watchers, build_backend};

/// Arguments for the regions command.
#[derive(Args, Debug, Clone)]
pub struct RegionsArgs {
    /// Cloud backend
    #[arg(short = 't', long = "type", value_enum)]
    pub backend: Option<BackendKind>,
}

/// Run `tunnelgate regions`.
///
/// # Errors
///
/// Returns an error if the backend cannot list its locations.
pub async fn run(app: &AppContext, args: &RegionsArgs) -> Result<()> {
    let kind = args.backend.unwrap_or(app.config.defaults.backend);
    let backend = build_backend(app, kind)?;
    let _watchers = Watchers::new(app, None);
    let mut locations = backend.locations(app.cancellation()).await?;
    locations.sort_by(|a, b| a.key.cmp(&b.key));
    app.renderer().render_locations(&locations)
}
