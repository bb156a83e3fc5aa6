//! Stack lifecycle: create, poll, roll back, delete, recreate.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::application::cancel::Cancellation;
use crate::application::ports::StackApi;
use crate::domain::error::StackError;
use crate::domain::stack::{CreateOutcome, StackSpec, StackStatus, failure_reasons};

/// Interval between `describe-stacks` polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Creates `spec` (an existing stack of that name is adopted) and waits for
/// it to complete. Returns the stack outputs.
///
/// # Errors
///
/// Returns [`StackError::CreateFailed`] after issuing one rollback delete if
/// the stack reaches a failure state, or `Cancelled`.
pub async fn ensure_stack(
    api: &impl StackApi,
    spec: &StackSpec,
    cancel: &Cancellation,
) -> Result<BTreeMap<String, String>> {
    cancel.check()?;
    let outcome = api
        .create_stack(spec)
        .await
        .with_context(|| format!("creating stack {}", spec.name))?;
    match outcome {
        CreateOutcome::Submitted => tracing::info!(stack = %spec.name, "stack create submitted"),
        CreateOutcome::AlreadyExists => {
            tracing::info!(stack = %spec.name, "stack already exists, waiting for it");
        }
    }
    wait_for_create(api, &spec.name, cancel).await
}

/// Deletes any existing stack named like `spec`, waits for that, then
/// creates it fresh. Stacks are never updated in place.
///
/// # Errors
///
/// Returns an error if deleting the old stack or creating the new one fails.
pub async fn recreate_stack(
    api: &impl StackApi,
    spec: &StackSpec,
    cancel: &Cancellation,
) -> Result<BTreeMap<String, String>> {
    let existing = api
        .describe_stack(&spec.name)
        .await
        .with_context(|| format!("describing stack {}", spec.name))?;
    if let Some(existing) = existing.filter(|d| d.status != StackStatus::DeleteComplete) {
        tracing::info!(stack = %spec.name, status = %existing.raw_status, "replacing existing stack");
        delete_stack(api, &spec.name, cancel).await?;
    }
    ensure_stack(api, spec, cancel).await
}

async fn wait_for_create(
    api: &impl StackApi,
    name: &str,
    cancel: &Cancellation,
) -> Result<BTreeMap<String, String>> {
    loop {
        cancel.sleep(POLL_INTERVAL).await?;
        let description = match api.describe_stack(name).await {
            Ok(Some(d)) => d,
            Ok(None) => bail!("stack {name} disappeared while being created"),
            Err(e) => {
                rollback(api, name).await;
                return Err(e.context(format!("describing stack {name}")));
            }
        };
        tracing::debug!(stack = %name, status = %description.raw_status, "stack status");

        if description.status == StackStatus::Created {
            return Ok(description.outputs);
        }
        if description.status.is_create_failure() {
            let events = match api.stack_events(name).await {
                Ok(events) => events,
                Err(e) => {
                    tracing::warn!(stack = %name, error = %format!("{e:#}"), "cannot read stack events");
                    Vec::new()
                }
            };
            let reasons = failure_reasons(Some(&description), &events);
            tracing::error!(stack = %name, reasons = %reasons.join(", "), "stack creation failed");
            rollback(api, name).await;
            return Err(StackError::CreateFailed {
                name: name.to_string(),
                status: description.raw_status,
                reasons,
            }
            .into());
        }
    }
}

/// Issues a single delete without waiting. Failures are logged only.
pub async fn rollback(api: &impl StackApi, name: &str) {
    tracing::info!(stack = %name, "rolling back stack");
    if let Err(e) = api.delete_stack(name).await {
        tracing::error!(stack = %name, error = %format!("{e:#}"), "failed to delete stack");
    }
}

/// Deletes `name` and waits until it is gone. A missing stack is success.
///
/// # Errors
///
/// Returns [`StackError::DeleteFailed`] on `DELETE_FAILED`, API errors, or `Cancelled`.
pub async fn delete_stack(api: &impl StackApi, name: &str, cancel: &Cancellation) -> Result<()> {
    cancel.check()?;
    tracing::debug!(stack = %name, "deleting stack");
    api.delete_stack(name)
        .await
        .with_context(|| format!("deleting stack {name}"))?;

    loop {
        let Some(description) = api
            .describe_stack(name)
            .await
            .with_context(|| format!("describing stack {name}"))?
        else {
            return Ok(());
        };
        match description.status {
            StackStatus::DeleteComplete => return Ok(()),
            StackStatus::DeleteFailed => {
                return Err(StackError::DeleteFailed {
                    name: name.to_string(),
                }
                .into());
            }
            _ => tracing::debug!(stack = %name, status = %description.raw_status, "deleting..."),
        }
        cancel.sleep(POLL_INTERVAL).await?;
    }
}
