//! Declarative resource groups (CloudFormation stacks) and their lifecycle states.

use std::collections::BTreeMap;

/// Everything needed to submit one stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackSpec {
    pub name: String,
    pub template_body: String,
    pub parameters: BTreeMap<String, String>,
}

impl StackSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, template_body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template_body: template_body.into(),
            parameters: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

/// Lifecycle state of a stack, collapsed from the provider's status strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackStatus {
    Pending,
    Created,
    CreateFailed,
    RollbackComplete,
    RollbackFailed,
    DeleteFailed,
    DeleteComplete,
}

impl StackStatus {
    /// Maps a CloudFormation `StackStatus` string.
    ///
    /// Update states and in-progress states are all `Pending`: the primary
    /// stack is never updated in place, so they only appear transiently.
    #[must_use]
    pub fn from_aws(status: &str) -> Self {
        match status {
            "CREATE_COMPLETE" | "UPDATE_COMPLETE" | "IMPORT_COMPLETE" => Self::Created,
            "CREATE_FAILED" => Self::CreateFailed,
            "ROLLBACK_COMPLETE" | "UPDATE_ROLLBACK_COMPLETE" => Self::RollbackComplete,
            "ROLLBACK_FAILED" | "UPDATE_ROLLBACK_FAILED" | "UPDATE_FAILED" => Self::RollbackFailed,
            "DELETE_FAILED" => Self::DeleteFailed,
            "DELETE_COMPLETE" => Self::DeleteComplete,
            _ => Self::Pending,
        }
    }

    /// States that end a create attempt unsuccessfully.
    #[must_use]
    pub fn is_create_failure(self) -> bool {
        matches!(
            self,
            Self::CreateFailed
                | Self::RollbackComplete
                | Self::RollbackFailed
                | Self::DeleteFailed
                | Self::DeleteComplete
        )
    }
}

/// Result of one describe call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackDescription {
    /// Raw provider status, kept for error messages.
    pub raw_status: String,
    pub status: StackStatus,
    pub status_reason: Option<String>,
    pub outputs: BTreeMap<String, String>,
}

impl StackDescription {
    #[must_use]
    pub fn new(raw_status: &str) -> Self {
        Self {
            raw_status: raw_status.to_string(),
            status: StackStatus::from_aws(raw_status),
            status_reason: None,
            outputs: BTreeMap::new(),
        }
    }
}

/// One entry of a stack's event history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackEvent {
    pub logical_id: String,
    pub status: String,
    pub reason: Option<String>,
}

/// What the provider answered to a create request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Submitted,
    AlreadyExists,
}

/// Human-readable failure reasons for a failed stack.
///
/// The stack's own status reason wins when present; otherwise every
/// `CREATE_FAILED` event reason is returned in history order.
#[must_use]
pub fn failure_reasons(description: Option<&StackDescription>, events: &[StackEvent]) -> Vec<String> {
    if let Some(reason) = description
        .and_then(|d| d.status_reason.as_deref())
        .map(str::trim)
        .filter(|r| !r.is_empty())
    {
        return vec![reason.to_string()];
    }
    events
        .iter()
        .filter(|e| e.status == "CREATE_FAILED")
        .filter_map(|e| {
            e.reason
                .as_deref()
                .map(|r| format!("{}: {r}", e.logical_id))
        })
        .collect()
}
