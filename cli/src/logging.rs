//! Operational log setup. Logs go to stderr so stdout stays parseable.

use tracing_subscriber::EnvFilter;

/// Maps the `-v` count to a default filter; `RUST_LOG` wins when set.
#[must_use]
pub fn default_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "tunnelgate=info,warn",
        _ => "tunnelgate=debug,info",
    }
}

/// Install the global subscriber. Safe to call once per process.
pub fn init(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose > 1)
        .try_init();
}
