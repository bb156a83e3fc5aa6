//! Output formatting module

pub mod human;
pub mod json;
pub mod progress;
pub mod styles;

use anyhow::Result;
use console::Term;
use owo_colors::OwoColorize as _;
use tunnelgate_common::{BackendKind, Location, ProvisionResult};

pub use human::HumanRenderer;
pub use json::JsonRenderer;
pub use styles::Styles;

/// Renders command results in the selected output mode.
pub enum Renderer<'a> {
    Human(HumanRenderer<'a>),
    Json(JsonRenderer),
}

impl Renderer<'_> {
    /// Print a finished deployment; `port` is the gateway's listen port.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_deployment(&self, result: &ProvisionResult, port: u16) -> Result<()> {
        match self {
            Renderer::Human(r) => {
                r.render_deployment(result, port);
                Ok(())
            }
            Renderer::Json(r) => r.render_deployment(result, port),
        }
    }

    /// What `delete` is about to remove, shown before the confirmation prompt.
    /// Silent in JSON mode.
    pub fn render_delete_plan(&self, id: &str, backend: BackendKind, region: &str) {
        if let Renderer::Human(r) = self {
            r.render_delete_plan(id, backend, region);
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_deleted(&self, id: &str) -> Result<()> {
        match self {
            Renderer::Human(r) => {
                r.render_deleted(id);
                Ok(())
            }
            Renderer::Json(r) => r.render_deleted(id),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_locations(&self, locations: &[Location]) -> Result<()> {
        match self {
            Renderer::Human(r) => {
                r.render_locations(locations);
                Ok(())
            }
            Renderer::Json(r) => r.render_locations(locations),
        }
    }
}

/// Output context carrying styling and terminal state.
pub struct OutputContext {
    /// Stylesheet for colored output.
    pub styles: Styles,
    /// Whether stdout is a TTY.
    pub is_tty: bool,
    /// Whether to suppress non-error output.
    pub quiet: bool,
}

impl OutputContext {
    /// Create output context based on CLI flags and environment.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let is_tty = Term::stdout().is_term();
        let use_colors = !no_color && is_tty && std::env::var("NO_COLOR").is_err();

        let mut styles = Styles::default();
        if use_colors {
            styles.colorize();
        }

        Self {
            styles,
            is_tty,
            quiet,
        }
    }

    /// Check if progress indicators should be shown.
    #[must_use]
    pub fn show_progress(&self) -> bool {
        self.is_tty && !self.quiet
    }

    /// Print a success message prefixed with `✓`. Suppressed when `quiet`.
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "✓".style(self.styles.success));
        }
    }

    /// Print a warning message prefixed with `⚠`. Suppressed when `quiet`.
    pub fn warn(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "⚠".style(self.styles.warning));
        }
    }

    /// Print an info message prefixed with `ℹ`. Suppressed when `quiet`.
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "ℹ".style(self.styles.info));
        }
    }

    /// Print a key-value pair with the key dimmed. Suppressed when `quiet`.
    pub fn kv(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("  {}  {value}", key.style(self.styles.dim));
        }
    }
}
