//! `tunnelgate deploy`: create a gateway and print the peer configuration.

use std::net::IpAddr;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use tunnelgate_common::{BackendKind, ProvisionResult};

use crate::app::AppContext;
use crate::application::cancel::Cancellation;
use crate::application::ports::Provisioner;
use crate::commands::{Watchers, build_backend};
use crate::domain::config::AppConfig;
use crate::domain::request::ProvisionRequest;
use crate::output::progress;

/// Arguments for the deploy command.
#[derive(Args, Debug, Clone)]
pub struct DeployArgs {
    /// WireGuard public key of the client
    #[arg(short = 'k', long = "public-key", env = "TUNNELGATE_PUBLIC_KEY")]
    pub public_key: String,

    /// WireGuard listen port on the gateway
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Region to deploy to (see `tunnelgate regions`)
    #[arg(short, long, env = "TUNNELGATE_REGION")]
    pub region: Option<String>,

    /// Name of the gateway; reusing a name replaces that gateway
    #[arg(short, long)]
    pub id: Option<String>,

    /// Cloud backend
    #[arg(short = 't', long = "type", value_enum)]
    pub backend: Option<BackendKind>,

    /// Tunnel address of the client
    #[arg(long)]
    pub client_addr: Option<IpAddr>,

    /// Tunnel address of the gateway
    #[arg(long)]
    pub server_addr: Option<IpAddr>,

    /// Give up and roll back after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl DeployArgs {
    /// Fills unset flags from the configured defaults.
    #[must_use]
    pub fn to_request(&self, config: &AppConfig) -> ProvisionRequest {
        let defaults = &config.defaults;
        ProvisionRequest {
            client_public_key: self.public_key.trim().to_string(),
            client_addr: self.client_addr.unwrap_or(defaults.client_addr),
            server_addr: self.server_addr.unwrap_or(defaults.server_addr),
            port: self.port.unwrap_or(defaults.port),
            backend: self.backend.unwrap_or(defaults.backend),
            region: self.region.clone().unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn id<'a>(&'a self, config: &'a AppConfig) -> &'a str {
        self.id.as_deref().unwrap_or(&config.defaults.id)
    }
}

/// Run `tunnelgate deploy`.
///
/// # Errors
///
/// Returns an error if the request is invalid or provisioning fails.
pub async fn run(app: &AppContext, args: &DeployArgs) -> Result<()> {
    let request = args.to_request(&app.config);
    request.validate()?;
    let id = args.id(&app.config);
    let backend = build_backend(app, request.backend)?;
    let _watchers = Watchers::new(app, args.timeout.map(Duration::from_secs));

    let spinner = app.show_spinner().then(|| {
        progress::spinner(&format!(
            "Deploying {id} to {} ({})...",
            request.region, request.backend
        ))
    });
    let result = execute(&backend, id, &request, app.cancellation()).await;
    if let Some(pb) = &spinner {
        match &result {
            Ok(_) => progress::finish_ok(pb, &format!("Gateway {id} is up")),
            Err(_) => pb.finish_and_clear(),
        }
    }

    let result = result?;
    app.renderer().render_deployment(&result, request.port)
}

/// Provisions `id` and logs the outcome.
///
/// # Errors
///
/// Returns the provisioner's error unchanged.
pub async fn execute(
    provisioner: &impl Provisioner,
    id: &str,
    request: &ProvisionRequest,
    cancel: &Cancellation,
) -> Result<ProvisionResult> {
    tracing::info!(%id, backend = %request.backend, region = %request.region, "provisioning");
    let result = provisioner.provision(id, request, cancel).await?;
    tracing::info!(%id, ip = %result.server_ip, "gateway ready");
    Ok(result)
}
