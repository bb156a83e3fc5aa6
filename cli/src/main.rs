//! tunnelgate - On-demand WireGuard gateways on AWS and Hetzner Cloud

use clap::Parser;
use tunnelgate::cli::Cli;
use tunnelgate::output::json::{error_code, format_error};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    tunnelgate::logging::init(cli.verbose);
    let json = cli.json;

    if let Err(e) = cli.run().await {
        tracing::debug!(error = ?e, "command failed");
        let message = format!("{e:#}");
        match json.then(|| format_error(&message, error_code(&e))) {
            Some(Ok(body)) => println!("{body}"),
            _ => eprintln!("Error: {message}"),
        }
        std::process::exit(1);
    }
}
