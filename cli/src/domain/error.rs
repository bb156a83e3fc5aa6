//! Typed domain error enums.
//!
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator. Callers that need to branch on a failure class
//! downcast through the error chain (see [`is_cancelled`]).

use std::fmt;

use thiserror::Error;

// ── Cancellation ──────────────────────────────────────────────────────────────

/// The caller gave up: Ctrl-C, or the `--timeout` deadline elapsed.
///
/// Never retried and always distinguishable from backend failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Returns `true` if `err`, or anything in its context chain, is [`Cancelled`].
#[must_use]
pub fn is_cancelled(err: &anyhow::Error) -> bool {
    err.downcast_ref::<Cancelled>().is_some() || err.chain().any(|cause| cause.is::<Cancelled>())
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Missing environment, credentials, or invalid request values. Fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    MissingEnv(&'static str),

    #[error("AWS credentials are not usable: {0}\n\nConfigure them with 'aws configure' or AWS_PROFILE.")]
    MissingCredentials(String),

    #[error("a region is required (see 'tunnelgate regions')")]
    MissingRegion,

    #[error("Invalid value for {key}: {value}\n\nValid values: {valid}")]
    InvalidValue {
        key: String,
        value: String,
        valid: String,
    },

    #[error("cannot parse config file {path}: {reason}")]
    Unparseable { path: String, reason: String },
}

// ── Stack errors ──────────────────────────────────────────────────────────────

/// Terminal resource-group states.
#[derive(Debug, Error)]
pub enum StackError {
    #[error("stack {name} failed with status {status}{}", format_reasons(.reasons))]
    CreateFailed {
        name: String,
        status: String,
        reasons: Vec<String>,
    },

    #[error("stack {name} could not be deleted (DELETE_FAILED)")]
    DeleteFailed { name: String },

    #[error("stack {name} has no output named {key}")]
    MissingOutput { name: String, key: String },
}

fn format_reasons(reasons: &[String]) -> String {
    if reasons.is_empty() {
        String::new()
    } else {
        format!(": {}", reasons.join(", "))
    }
}

// ── Remote errors ─────────────────────────────────────────────────────────────

/// Failures executing scripts on the gateway host.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The command ran (or was attempted) and failed. Output is kept for diagnostics.
    #[error("remote command failed: {reason}")]
    CommandFailed {
        reason: String,
        stdout: String,
        stderr: String,
    },

    #[error("host did not become reachable within {waited_secs}s{}", format_last_error(.last_error))]
    NotReady {
        waited_secs: u64,
        last_error: Option<String>,
    },

    #[error("init script did not return expected output: {0}")]
    MalformedOutput(String),
}

fn format_last_error(last_error: &Option<String>) -> String {
    last_error
        .as_deref()
        .map(|e| format!(": {e}"))
        .unwrap_or_default()
}

// ── Asset errors ──────────────────────────────────────────────────────────────

/// Contract violations in the deployment/asset manifests.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("unknown packaging type '{0}' (expected 'zip' or 'file')")]
    UnknownPackaging(String),

    #[error("deployment manifest has no stack artifact")]
    MissingStackArtifact,

    #[error("deployment manifest has {0} stack artifacts, expected exactly one")]
    AmbiguousStackArtifacts(usize),

    #[error("deployment manifest has no asset manifest artifact")]
    MissingAssetManifest,
}

// ── Teardown errors ───────────────────────────────────────────────────────────

/// One teardown task that still failed after retries.
#[derive(Debug)]
pub struct TeardownFailure {
    /// Human-readable task name, e.g. `stack tunnelgate-bootstrap`.
    pub task: String,
    pub error: anyhow::Error,
}

/// Every teardown task that failed. Resources named here need manual attention.
#[derive(Debug, Error)]
pub struct TeardownError {
    pub failures: Vec<TeardownFailure>,
}

impl fmt::Display for TeardownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} teardown task(s) failed:", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "\n  - {}: {:#}", failure.task, failure.error)?;
        }
        Ok(())
    }
}
