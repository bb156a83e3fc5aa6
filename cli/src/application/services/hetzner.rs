//! Hetzner Cloud backend: ssh key, firewall and server managed directly,
//! configured over SSH with an ephemeral key pair.
//!
//! Imports only from `crate::domain` and `crate::application`.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tunnelgate_common::{Location, ProvisionResult};

use crate::application::cancel::Cancellation;
use crate::application::ports::{
    AssetSource, CloudServers, Provisioner, ServerSpec, SshIdentity, SshTransport,
};
use crate::application::services::init_script::run_init_script;
use crate::application::services::readiness::{ReadinessCheck, SSH_CHECK, wait_until_ready};
use crate::application::services::remote::SshExecutor;
use crate::application::services::retry::RetryPolicy;
use crate::application::services::teardown::{TeardownTask, run_teardown};
use crate::domain::hetzner::{ServerRecord, gateway_firewall_rules};
use crate::domain::request::{DeprovisionRequest, ProvisionRequest};

/// Interval between server status polls.
pub const SERVER_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HetznerSettings {
    pub image: String,
    pub server_type: String,
}

pub struct HetznerProvisioner<C, K, A> {
    servers: C,
    ssh: K,
    assets: A,
    settings: HetznerSettings,
    retry: RetryPolicy,
    check: ReadinessCheck,
}

impl<C, K, A> HetznerProvisioner<C, K, A>
where
    C: CloudServers,
    K: SshTransport,
    A: AssetSource,
{
    pub fn new(servers: C, ssh: K, assets: A, settings: HetznerSettings) -> Self {
        Self {
            servers,
            ssh,
            assets,
            settings,
            retry: RetryPolicy::default(),
            check: SSH_CHECK,
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Deletes any key of that name, then uploads `public_key`. Keys are never updated.
    async fn replace_ssh_key(&self, name: &str, public_key: &str) -> Result<()> {
        if self.servers.find_ssh_key(name).await?.is_some() {
            tracing::debug!(%name, "deleting old ssh key");
            self.servers.delete_ssh_key(name).await?;
        }
        self.servers
            .create_ssh_key(name, public_key)
            .await
            .with_context(|| format!("creating ssh key {name}"))
    }

    /// Replaces all rules of an existing firewall, or creates it.
    async fn create_or_update_firewall(&self, name: &str, port: u16) -> Result<()> {
        let rules = gateway_firewall_rules(port);
        if self.servers.find_firewall(name).await?.is_some() {
            tracing::debug!(%name, "replacing firewall rules");
            self.servers.replace_firewall_rules(name, &rules).await
        } else {
            self.servers
                .create_firewall(name, &rules)
                .await
                .with_context(|| format!("creating firewall {name}"))
        }
    }

    async fn recreate_server(&self, id: &str, location: &str) -> Result<()> {
        if self.servers.find_server(id).await?.is_some() {
            tracing::info!(server = %id, "replacing existing server");
            self.servers.delete_server(id).await?;
        }
        self.servers
            .create_server(&ServerSpec {
                name: id,
                image: &self.settings.image,
                server_type: &self.settings.server_type,
                location,
                ssh_key: id,
                firewall: id,
            })
            .await
            .with_context(|| format!("creating server {id}"))
    }

    async fn wait_until_running(&self, id: &str, cancel: &Cancellation) -> Result<ServerRecord> {
        loop {
            let server = cancel
                .race(self.servers.find_server(id))
                .await??
                .ok_or_else(|| anyhow!("server {id} disappeared while starting"))?;
            if server.is_running() {
                return Ok(server);
            }
            tracing::debug!(server = %id, status = %server.status, "waiting for server");
            cancel.sleep(SERVER_POLL_INTERVAL).await?;
        }
    }

    async fn configure_server(
        &self,
        server: &ServerRecord,
        identity: &K::Identity,
        request: &ProvisionRequest,
        cancel: &Cancellation,
    ) -> Result<ProvisionResult> {
        let server_ip = server
            .public_ipv4()
            .with_context(|| format!("server {} has no public IPv4 address", server.name))?;
        let executor = SshExecutor::new(&self.ssh, identity, server_ip);

        tracing::info!(server = %server.name, ip = %server_ip, "waiting for ssh");
        wait_until_ready(&executor, &self.check, cancel).await?;
        tracing::info!("running init script");
        let outcome = run_init_script(&executor, &self.assets, request, cancel).await?;

        Ok(ProvisionResult {
            server_ip,
            server_addr: request.server_addr,
            server_public_key: outcome.server_wg_public_key,
        })
    }

    async fn delete_server_and_firewall(&self, id: &str) -> Result<()> {
        if self.servers.find_server(id).await?.is_some() {
            self.servers.delete_server(id).await?;
        }
        // A firewall cannot be deleted while it is still applied to a server.
        if self.servers.find_firewall(id).await?.is_some() {
            self.servers.delete_firewall(id).await?;
        }
        Ok(())
    }

    async fn delete_ssh_key(&self, id: &str) -> Result<()> {
        if self.servers.find_ssh_key(id).await?.is_some() {
            self.servers.delete_ssh_key(id).await?;
        }
        Ok(())
    }
}

impl<C, K, A> Provisioner for HetznerProvisioner<C, K, A>
where
    C: CloudServers,
    K: SshTransport,
    A: AssetSource,
{
    async fn provision(
        &self,
        id: &str,
        request: &ProvisionRequest,
        cancel: &Cancellation,
    ) -> Result<ProvisionResult> {
        request.validate()?;
        let identity = self.ssh.generate_identity().await?;

        tracing::info!(name = %id, "creating ssh key");
        self.replace_ssh_key(id, identity.authorized_key()).await?;
        tracing::info!(name = %id, "creating firewall");
        self.create_or_update_firewall(id, request.port).await?;
        tracing::info!(server = %id, location = %request.region, "creating server");
        cancel.check()?;
        self.recreate_server(id, &request.region).await?;

        let configured = async {
            let server = self.wait_until_running(id, cancel).await?;
            self.configure_server(&server, &identity, request, cancel).await
        }
        .await;

        if configured.is_err() {
            tracing::info!(server = %id, "cleaning up server");
            if let Err(e) = self.servers.delete_server(id).await {
                tracing::error!(server = %id, error = %format!("{e:#}"), "failed to delete server");
            }
        }
        configured
    }

    async fn deprovision(
        &self,
        id: &str,
        request: &DeprovisionRequest,
        cancel: &Cancellation,
    ) -> Result<()> {
        request.validate()?;
        let tasks = vec![
            TeardownTask::new(format!("server and firewall {id}"), move || {
                Box::pin(self.delete_server_and_firewall(id))
            }),
            TeardownTask::new(format!("ssh key {id}"), move || Box::pin(self.delete_ssh_key(id))),
        ];
        run_teardown(tasks, &self.retry, cancel).await?;
        Ok(())
    }

    async fn locations(&self, cancel: &Cancellation) -> Result<Vec<Location>> {
        cancel.race(self.servers.locations()).await?
    }
}
