//! Application context: unified state passed to every command handler.
//!
//! Built once in `Cli::run()`. Holds output settings, the loaded
//! configuration and the cancellation signal fired by Ctrl-C.

use anyhow::Result;

use crate::application::cancel::{CancelHandle, Cancellation};
use crate::application::ports::ConfigStore;
use crate::domain::config::AppConfig;
use crate::infra::config::YamlConfigStore;
use crate::output::{HumanRenderer, JsonRenderer, OutputContext, Renderer};

/// Environment variable overriding the asset qualifier.
pub const QUALIFIER_ENV: &str = "CDK_CUSTOM_QUALIFIER";

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    pub no_color: bool,
    pub quiet: bool,
    pub json: bool,
    /// Number of `-v` flags.
    pub verbose: u8,
}

/// Behaviour flags.
pub struct BehaviourFlags {
    /// Skip interactive prompts (also set by `CI` / `TUNNELGATE_YES` env vars).
    pub yes: bool,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    pub output: OutputFlags,
    pub behaviour: BehaviourFlags,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// Configuration file merged with environment overrides.
    pub config: AppConfig,
    /// When `true`, skip interactive prompts and use defaults.
    pub non_interactive: bool,
    /// Operational logs are visible, so spinners stay off.
    pub verbose: bool,
    cancel: Cancellation,
    cancel_handle: CancelHandle,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be parsed or the
    /// `CDK_CUSTOM_QUALIFIER` override is invalid.
    pub fn new(flags: &AppFlags) -> Result<Self> {
        let config = YamlConfigStore
            .load()?
            .with_qualifier(std::env::var(QUALIFIER_ENV).ok().as_deref())?;
        Ok(Self::with_config(flags, config))
    }

    /// Construct an `AppContext` around an already-loaded configuration.
    #[must_use]
    pub fn with_config(flags: &AppFlags, config: AppConfig) -> Self {
        let ci_env = std::env::var("CI").is_ok() || std::env::var("TUNNELGATE_YES").is_ok();
        let non_interactive = flags.behaviour.yes || ci_env;

        let mode = if flags.output.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };
        let (cancel_handle, cancel) = Cancellation::new();

        Self {
            output: OutputContext::new(flags.output.no_color, flags.output.quiet),
            mode,
            config,
            non_interactive,
            verbose: flags.output.verbose > 0,
            cancel,
            cancel_handle,
        }
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Returns the appropriate `Renderer` variant for the current output mode.
    #[must_use]
    pub fn renderer(&self) -> Renderer<'_> {
        match self.mode {
            OutputMode::Human => Renderer::Human(HumanRenderer::new(&self.output)),
            OutputMode::Json => Renderer::Json(JsonRenderer),
        }
    }

    /// The signal every long-running operation races.
    #[must_use]
    pub fn cancellation(&self) -> &Cancellation {
        &self.cancel
    }

    /// A handle that fires [`AppContext::cancellation`], for signal handlers and deadlines.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel_handle.clone()
    }

    /// Whether a spinner should animate while a command waits on the cloud.
    #[must_use]
    pub fn show_spinner(&self) -> bool {
        !self.is_json() && !self.verbose && self.output.show_progress()
    }

    /// Ask the user for confirmation.
    ///
    /// When `non_interactive` is `true` (CI, `--yes` flag, or `TUNNELGATE_YES` env),
    /// returns `true` immediately without prompting.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails (e.g. no TTY available).
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.non_interactive {
            return Ok(true);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?;
        Ok(confirmed)
    }
}
