//! Concurrent, retrying teardown of independent resources.
//!
//! Every task runs to completion under the retry policy; failures are
//! collected instead of stopping at the first one.

use anyhow::Result;
use futures_util::future::{LocalBoxFuture, join_all};

use crate::application::cancel::Cancellation;
use crate::application::ports::ObjectStore;
use crate::application::services::retry::RetryPolicy;
use crate::domain::error::{TeardownError, TeardownFailure};

type TaskFn<'a> = Box<dyn FnMut() -> LocalBoxFuture<'a, Result<()>> + 'a>;

/// One named deletion, re-invocable for retries.
pub struct TeardownTask<'a> {
    name: String,
    run: TaskFn<'a>,
}

impl<'a> TeardownTask<'a> {
    pub fn new<F>(name: impl Into<String>, run: F) -> Self
    where
        F: FnMut() -> LocalBoxFuture<'a, Result<()>> + 'a,
    {
        Self {
            name: name.into(),
            run: Box::new(run),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Runs all `tasks` concurrently and joins their outcomes.
///
/// # Errors
///
/// Returns a [`TeardownError`] listing every task that still failed after retries.
pub async fn run_teardown(
    tasks: Vec<TeardownTask<'_>>,
    policy: &RetryPolicy,
    cancel: &Cancellation,
) -> Result<(), TeardownError> {
    let runs = tasks.into_iter().map(|mut task| async move {
        tracing::info!(task = %task.name, "teardown started");
        let result = policy.run(cancel, || (task.run)()).await;
        match &result {
            Ok(()) => tracing::info!(task = %task.name, "teardown finished"),
            Err(e) => tracing::error!(task = %task.name, error = %format!("{e:#}"), "teardown failed"),
        }
        (task.name, result)
    });

    let failures: Vec<TeardownFailure> = join_all(runs)
        .await
        .into_iter()
        .filter_map(|(task, result)| result.err().map(|error| TeardownFailure { task, error }))
        .collect();

    if failures.is_empty() {
        Ok(())
    } else {
        Err(TeardownError { failures })
    }
}

/// Empties and deletes `bucket`: current objects, then every version and
/// delete marker, then the bucket. A missing bucket is already torn down.
///
/// Single object deletions that fail are logged and skipped; the final
/// bucket deletion reports them.
///
/// # Errors
///
/// Returns an error if listing fails or the bucket cannot be deleted.
pub async fn delete_bucket(store: &impl ObjectStore, bucket: &str) -> Result<()> {
    tracing::debug!(%bucket, "emptying bucket");
    let Some(keys) = store.list_objects(bucket).await? else {
        tracing::debug!(%bucket, "bucket does not exist");
        return Ok(());
    };
    for key in &keys {
        if let Err(e) = store.delete_object(bucket, key, None).await {
            tracing::warn!(%bucket, %key, error = %format!("{e:#}"), "failed to delete object");
        }
    }

    tracing::debug!(%bucket, "emptying bucket versions");
    for version in store.list_object_versions(bucket).await? {
        if let Err(e) = store
            .delete_object(bucket, &version.key, Some(&version.version_id))
            .await
        {
            tracing::warn!(
                %bucket,
                key = %version.key,
                version = %version.version_id,
                error = %format!("{e:#}"),
                "failed to delete object version"
            );
        }
    }

    tracing::debug!(%bucket, "deleting bucket");
    store.delete_bucket(bucket).await
}
