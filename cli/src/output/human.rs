//! Human-readable terminal renderer.

use owo_colors::OwoColorize as _;
use tunnelgate_common::{BackendKind, Location, ProvisionResult};

use crate::output::OutputContext;

/// Keepalive that holds NAT mappings open on the client side.
const PERSISTENT_KEEPALIVE_SECS: u16 = 25;

/// Renders command results as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

/// The `[Peer]` section a client adds to its WireGuard config.
#[must_use]
pub fn peer_config(result: &ProvisionResult, port: u16) -> String {
    let endpoint = std::net::SocketAddr::new(result.server_ip, port);
    format!(
        "[Peer]\nPublicKey = {}\nAllowedIPs = 0.0.0.0/0\nEndpoint = {endpoint}\nPersistentKeepalive = {PERSISTENT_KEEPALIVE_SECS}\n",
        result.server_public_key
    )
}

/// One line of `tunnelgate regions`.
#[must_use]
pub fn location_line(location: &Location) -> String {
    match (location.city.is_empty(), location.country.is_empty()) {
        (false, false) => format!("{}: {}, {}", location.key, location.city, location.country),
        (true, false) => format!("{}: {}", location.key, location.country),
        (false, true) => format!("{}: {}", location.key, location.city),
        (true, true) => location.key.clone(),
    }
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Prints the peer block. Printed even with `--quiet`: it is the command's result.
    pub fn render_deployment(&self, result: &ProvisionResult, port: u16) {
        if !self.ctx.quiet {
            println!();
            self.ctx.kv("Gateway:", &result.server_ip.to_string());
            self.ctx.kv("Tunnel address:", &result.server_addr.to_string());
            println!();
            self.ctx
                .info("Add this peer to your WireGuard interface:");
            println!();
        }
        let block = peer_config(result, port);
        let mut lines = block.lines();
        if let Some(title) = lines.next() {
            println!("{}", title.style(self.ctx.styles.section));
        }
        for line in lines {
            println!("{line}");
        }
    }

    pub fn render_delete_plan(&self, id: &str, backend: BackendKind, region: &str) {
        if self.ctx.quiet {
            return;
        }
        println!();
        println!("This will remove gateway {id} in {region} ({backend}).");
        if backend == BackendKind::Aws {
            println!("The bootstrap stack and its asset bucket are removed too.");
        }
        println!();
    }

    pub fn render_deleted(&self, id: &str) {
        self.ctx.success(&format!("Gateway {id} removed"));
    }

    pub fn render_locations(&self, locations: &[Location]) {
        if locations.is_empty() {
            self.ctx.warn("No regions available.");
            return;
        }
        for location in locations {
            println!("{}", location_line(location));
        }
    }
}
