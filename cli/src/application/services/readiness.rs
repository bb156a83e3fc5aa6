//! Readiness gate: a freshly created host is polled with a trivial command
//! until it accepts remote execution.

use std::time::Duration;

use anyhow::Result;
use tokio::time::Instant;

use crate::application::cancel::Cancellation;
use crate::application::ports::RemoteExecutor;
use crate::domain::error::{RemoteError, is_cancelled};

/// How a backend checks that its host is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessCheck {
    pub script: &'static str,
    /// When set, stdout must equal this exactly (no trimming).
    pub expected_stdout: Option<&'static str>,
    pub delay: Duration,
    pub timeout: Duration,
}

pub const READINESS_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// SSM check. `printf` emits no newline, so stdout is compared to `1` as is.
pub const AGENT_CHECK: ReadinessCheck = ReadinessCheck {
    script: "printf 1",
    expected_stdout: Some("1"),
    delay: Duration::from_secs(10),
    timeout: READINESS_TIMEOUT,
};

/// SSH check: a successful exit is enough.
pub const SSH_CHECK: ReadinessCheck = ReadinessCheck {
    script: "echo 1",
    expected_stdout: None,
    delay: Duration::from_secs(5),
    timeout: READINESS_TIMEOUT,
};

/// Polls `check` through `executor` until it passes.
///
/// # Errors
///
/// Returns [`RemoteError::NotReady`] with the last transient error once the
/// timeout elapses, or `Cancelled`.
pub async fn wait_until_ready(
    executor: &impl RemoteExecutor,
    check: &ReadinessCheck,
    cancel: &Cancellation,
) -> Result<()> {
    let deadline = Instant::now() + check.timeout;
    let mut last_error: Option<String> = None;

    loop {
        if Instant::now() >= deadline {
            return Err(not_ready(check, last_error));
        }

        // A check that hangs is cut off at the deadline too.
        let run = executor.run(check.script, cancel);
        let Ok(attempt) = tokio::time::timeout_at(deadline, run).await else {
            tracing::debug!("readiness check still running at the deadline");
            return Err(not_ready(check, last_error));
        };

        match attempt {
            Ok(output) => match check.expected_stdout {
                Some(expected) if output.stdout != expected => {
                    tracing::debug!(stdout = %output.stdout, "readiness check returned unexpected output");
                }
                _ => return Ok(()),
            },
            Err(e) if is_cancelled(&e) => return Err(e),
            Err(e) => {
                tracing::info!(error = %format!("{e:#}"), "waiting for host to become ready");
                last_error = Some(format!("{e:#}"));
            }
        }

        cancel.sleep(check.delay).await?;
    }
}

fn not_ready(check: &ReadinessCheck, last_error: Option<String>) -> anyhow::Error {
    RemoteError::NotReady {
        waited_secs: check.timeout.as_secs(),
        last_error,
    }
    .into()
}
