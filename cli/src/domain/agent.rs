//! Host-agent (SSM) command invocation state.

/// Terminal and non-terminal states of an SSM command invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationStatus {
    Pending,
    InProgress,
    Delayed,
    Success,
    Failed,
    TimedOut,
    Cancelling,
    Cancelled,
}

impl InvocationStatus {
    /// Parses the `Status` field of `get-command-invocation`.
    ///
    /// Unknown values are treated as still in progress.
    #[must_use]
    pub fn parse(status: &str) -> Self {
        match status {
            "Pending" => Self::Pending,
            "Delayed" => Self::Delayed,
            "Success" => Self::Success,
            "Failed" => Self::Failed,
            "TimedOut" => Self::TimedOut,
            "Cancelling" => Self::Cancelling,
            "Cancelled" => Self::Cancelled,
            _ => Self::InProgress,
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Success | Self::Failed | Self::TimedOut | Self::Cancelling | Self::Cancelled
        )
    }
}

/// One poll of a dispatched command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub status: InvocationStatus,
    pub response_code: i64,
    pub stdout: String,
    pub stderr: String,
}

impl CommandInvocation {
    /// `Success` alone is not enough: the script's exit code must be zero too.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.status == InvocationStatus::Success && self.response_code == 0
    }
}
