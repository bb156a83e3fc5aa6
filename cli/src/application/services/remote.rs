//! The two `RemoteExecutor` transports: SSM agent dispatch and direct SSH.

use std::net::IpAddr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::cancel::Cancellation;
use crate::application::ports::{CommandAgent, RemoteExecutor, RemoteOutput, SshTransport};
use crate::domain::agent::InvocationStatus;
use crate::domain::error::RemoteError;

/// Interval between `get-command-invocation` polls.
pub const AGENT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Runs scripts through the SSM agent of one instance.
pub struct AgentExecutor<'a, A> {
    agent: &'a A,
    instance_id: String,
    poll_interval: Duration,
}

impl<'a, A: CommandAgent> AgentExecutor<'a, A> {
    pub fn new(agent: &'a A, instance_id: impl Into<String>) -> Self {
        Self {
            agent,
            instance_id: instance_id.into(),
            poll_interval: AGENT_POLL_INTERVAL,
        }
    }
}

impl<A: CommandAgent> RemoteExecutor for AgentExecutor<'_, A> {
    async fn run(&self, script: &str, cancel: &Cancellation) -> Result<RemoteOutput> {
        let command_id = cancel
            .race(self.agent.send_command(&self.instance_id, script))
            .await?
            .with_context(|| format!("sending command to {}", self.instance_id))?;
        tracing::debug!(instance = %self.instance_id, %command_id, "command sent");

        loop {
            cancel.sleep(self.poll_interval).await?;
            let invocation = cancel
                .race(self.agent.command_invocation(&command_id, &self.instance_id))
                .await??;
            tracing::debug!(status = ?invocation.status, "command status");
            if !invocation.status.is_terminal() {
                continue;
            }

            let succeeded = invocation.succeeded();
            let reason = match invocation.status {
                InvocationStatus::Success => {
                    format!("exited with code {}", invocation.response_code)
                }
                InvocationStatus::TimedOut => "command timed out".to_string(),
                InvocationStatus::Cancelling | InvocationStatus::Cancelled => {
                    "command was cancelled".to_string()
                }
                _ => "command failed".to_string(),
            };
            if succeeded {
                return Ok(RemoteOutput {
                    stdout: invocation.stdout,
                    stderr: invocation.stderr,
                });
            }
            return Err(RemoteError::CommandFailed {
                reason,
                stdout: invocation.stdout,
                stderr: invocation.stderr,
            }
            .into());
        }
    }
}

/// Runs scripts over SSH with an ephemeral identity.
pub struct SshExecutor<'a, T: SshTransport> {
    transport: &'a T,
    identity: &'a T::Identity,
    host: IpAddr,
}

impl<'a, T: SshTransport> SshExecutor<'a, T> {
    pub fn new(transport: &'a T, identity: &'a T::Identity, host: IpAddr) -> Self {
        Self {
            transport,
            identity,
            host,
        }
    }
}

impl<T: SshTransport> RemoteExecutor for SshExecutor<'_, T> {
    async fn run(&self, script: &str, cancel: &Cancellation) -> Result<RemoteOutput> {
        cancel
            .race(self.transport.exec(self.identity, self.host, script, cancel))
            .await?
    }
}
