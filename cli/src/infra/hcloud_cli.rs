//! Hetzner adapter: implements `CloudServers` with the `hcloud` CLI.

use std::io::Write as _;

use anyhow::{Context, Result, bail};
use serde::de::DeserializeOwned;
use tunnelgate_common::Location;

use crate::application::ports::{CloudServers, CommandRunner, ServerSpec};
use crate::domain::hetzner::{FirewallRule, LocationRecord, NamedResource, ServerRecord};

const HCLOUD: &str = "hcloud";

/// `hcloud` authenticated through `HCLOUD_TOKEN`.
#[derive(Clone)]
pub struct HcloudCli<R> {
    runner: R,
    token: String,
}

impl<R: CommandRunner> HcloudCli<R> {
    pub fn new(runner: R, token: impl Into<String>) -> Self {
        Self {
            runner,
            token: token.into(),
        }
    }

    async fn call(&self, args: &[&str]) -> Result<std::process::Output> {
        self.runner
            .run_with_env(HCLOUD, args, &[("HCLOUD_TOKEN", self.token.as_str())])
            .await
    }

    async fn expect_success(&self, args: &[&str]) -> Result<String> {
        let output = self.call(args).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("hcloud {} failed: {}", args.join(" "), stderr.trim());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// `hcloud <kind> describe <name> -o json`, `None` when it does not exist.
    async fn describe<T: DeserializeOwned>(&self, kind: &str, name: &str) -> Result<Option<T>> {
        let output = self.call(&[kind, "describe", name, "-o", "json"]).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.to_lowercase().contains("not found") {
                return Ok(None);
            }
            bail!("hcloud {kind} describe {name} failed: {}", stderr.trim());
        }
        let parsed = serde_json::from_slice(&output.stdout)
            .with_context(|| format!("unexpected output from hcloud {kind} describe"))?;
        Ok(Some(parsed))
    }
}

fn rules_file(rules: &[FirewallRule]) -> Result<tempfile::NamedTempFile> {
    let mut file = tempfile::NamedTempFile::new().context("creating rules file")?;
    serde_json::to_writer(&mut file, rules).context("writing rules file")?;
    file.flush().context("flushing rules file")?;
    Ok(file)
}

fn path_str(file: &tempfile::NamedTempFile) -> Result<&str> {
    file.path().to_str().context("temp path is not valid UTF-8")
}

impl<R: CommandRunner> CloudServers for HcloudCli<R> {
    async fn find_ssh_key(&self, name: &str) -> Result<Option<NamedResource>> {
        self.describe("ssh-key", name).await
    }

    async fn create_ssh_key(&self, name: &str, public_key: &str) -> Result<()> {
        self.expect_success(&["ssh-key", "create", "--name", name, "--public-key", public_key])
            .await?;
        Ok(())
    }

    async fn delete_ssh_key(&self, name: &str) -> Result<()> {
        self.expect_success(&["ssh-key", "delete", name]).await?;
        Ok(())
    }

    async fn find_firewall(&self, name: &str) -> Result<Option<NamedResource>> {
        self.describe("firewall", name).await
    }

    async fn create_firewall(&self, name: &str, rules: &[FirewallRule]) -> Result<()> {
        let file = rules_file(rules)?;
        self.expect_success(&["firewall", "create", "--name", name, "--rules-file", path_str(&file)?])
            .await?;
        Ok(())
    }

    async fn replace_firewall_rules(&self, name: &str, rules: &[FirewallRule]) -> Result<()> {
        let file = rules_file(rules)?;
        self.expect_success(&["firewall", "replace-rules", name, "--rules-file", path_str(&file)?])
            .await?;
        Ok(())
    }

    async fn delete_firewall(&self, name: &str) -> Result<()> {
        self.expect_success(&["firewall", "delete", name]).await?;
        Ok(())
    }

    async fn find_server(&self, name: &str) -> Result<Option<ServerRecord>> {
        self.describe("server", name).await
    }

    async fn create_server(&self, spec: &ServerSpec<'_>) -> Result<()> {
        self.expect_success(&[
            "server",
            "create",
            "--name",
            spec.name,
            "--image",
            spec.image,
            "--type",
            spec.server_type,
            "--location",
            spec.location,
            "--ssh-key",
            spec.ssh_key,
            "--firewall",
            spec.firewall,
        ])
        .await?;
        Ok(())
    }

    async fn delete_server(&self, name: &str) -> Result<()> {
        self.expect_success(&["server", "delete", name]).await?;
        Ok(())
    }

    async fn locations(&self) -> Result<Vec<Location>> {
        let stdout = self.expect_success(&["location", "list", "-o", "json"]).await?;
        let records: Vec<LocationRecord> =
            serde_json::from_str(&stdout).context("unexpected output from hcloud location list")?;
        Ok(records.into_iter().map(Location::from).collect())
    }
}
