//! Static dispatch over the two provisioner implementations.

use anyhow::Result;
use tunnelgate_common::{BackendKind, Location, ProvisionResult};

use crate::application::cancel::Cancellation;
use crate::application::ports::{
    AssetSource, AwsSession, CloudServers, Provisioner, SshTransport,
};
use crate::application::services::aws::AwsProvisioner;
use crate::application::services::hetzner::HetznerProvisioner;
use crate::domain::request::{DeprovisionRequest, ProvisionRequest};

/// One of the supported backends, selected at runtime.
pub enum Backend<S, C, K, A> {
    Aws(AwsProvisioner<S, A>),
    Hetzner(HetznerProvisioner<C, K, A>),
}

impl<S, C, K, A> Backend<S, C, K, A> {
    #[must_use]
    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Aws(_) => BackendKind::Aws,
            Backend::Hetzner(_) => BackendKind::Hetzner,
        }
    }
}

impl<S, C, K, A> Provisioner for Backend<S, C, K, A>
where
    S: AwsSession,
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
        match self {
            Backend::Aws(p) => p.provision(id, request, cancel).await,
            Backend::Hetzner(p) => p.provision(id, request, cancel).await,
        }
    }

    async fn deprovision(
        &self,
        id: &str,
        request: &DeprovisionRequest,
        cancel: &Cancellation,
    ) -> Result<()> {
        match self {
            Backend::Aws(p) => p.deprovision(id, request, cancel).await,
            Backend::Hetzner(p) => p.deprovision(id, request, cancel).await,
        }
    }

    async fn locations(&self, cancel: &Cancellation) -> Result<Vec<Location>> {
        match self {
            Backend::Aws(p) => p.locations(cancel).await,
            Backend::Hetzner(p) => p.locations(cancel).await,
        }
    }
}
