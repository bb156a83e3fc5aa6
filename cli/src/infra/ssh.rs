//! OpenSSH-backed `SshTransport`: ephemeral ed25519 keys from `ssh-keygen`
//! and script execution through `ssh ... bash -s`.

use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::application::cancel::Cancellation;
use crate::application::ports::{CommandRunner, RemoteOutput, SshIdentity, SshTransport};
use crate::domain::error::RemoteError;

const KEY_COMMENT: &str = "tunnelgate";

/// A key pair living in a private temp dir, removed on drop.
#[derive(Debug)]
pub struct SshKeyPair {
    _dir: TempDir,
    private_key: PathBuf,
    authorized_key: String,
}

impl SshIdentity for SshKeyPair {
    fn authorized_key(&self) -> &str {
        &self.authorized_key
    }
}

pub struct OpenSsh<R> {
    runner: R,
}

impl<R: CommandRunner> OpenSsh<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

/// Options for a throwaway host: no host key pinning, no prompts.
fn ssh_args<'a>(key: &'a str, destination: &'a str) -> Vec<&'a str> {
    vec![
        "-i",
        key,
        "-o",
        "StrictHostKeyChecking=no",
        "-o",
        "UserKnownHostsFile=/dev/null",
        "-o",
        "BatchMode=yes",
        "-o",
        "ConnectTimeout=10",
        "-o",
        "LogLevel=ERROR",
        destination,
        "bash",
        "-s",
    ]
}

impl<R: CommandRunner> SshTransport for OpenSsh<R> {
    type Identity = SshKeyPair;

    async fn generate_identity(&self) -> Result<SshKeyPair> {
        let dir = tempfile::tempdir().context("creating key directory")?;
        let private_key = dir.path().join("id_ed25519");
        let key_arg = private_key.to_str().context("key path is not valid UTF-8")?;

        let output = self
            .runner
            .run(
                "ssh-keygen",
                &["-t", "ed25519", "-N", "", "-q", "-C", KEY_COMMENT, "-f", key_arg],
            )
            .await?;
        anyhow::ensure!(
            output.status.success(),
            "ssh-keygen failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );

        let public = private_key.with_extension("pub");
        let authorized_key = std::fs::read_to_string(&public)
            .with_context(|| format!("cannot read {}", public.display()))?
            .trim()
            .to_string();
        Ok(SshKeyPair {
            _dir: dir,
            private_key,
            authorized_key,
        })
    }

    async fn exec(
        &self,
        identity: &SshKeyPair,
        host: IpAddr,
        script: &str,
        cancel: &Cancellation,
    ) -> Result<RemoteOutput> {
        cancel.check()?;
        let key = identity
            .private_key
            .to_str()
            .context("key path is not valid UTF-8")?;
        let destination = format!("root@{host}");
        let output = self
            .runner
            .run_with_stdin("ssh", &ssh_args(key, &destination), script.as_bytes())
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            let reason = match output.status.code() {
                Some(code) => format!("exited with code {code}"),
                None => "terminated by signal".to_string(),
            };
            return Err(RemoteError::CommandFailed {
                reason,
                stdout,
                stderr,
            }
            .into());
        }
        Ok(RemoteOutput { stdout, stderr })
    }
}
