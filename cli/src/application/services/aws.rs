//! AWS backend: bootstrap stack, asset publishing, gateway stack, SSM.
//!
//! Imports only from `crate::domain` and `crate::application`.

use std::net::IpAddr;

use anyhow::{Context, Result};
use tunnelgate_common::{Location, ProvisionResult};

use crate::application::cancel::Cancellation;
use crate::application::ports::{AssetSource, AwsSession, Provisioner};
use crate::application::services::asset_deployer::publish_assets;
use crate::application::services::init_script::run_init_script;
use crate::application::services::readiness::{AGENT_CHECK, ReadinessCheck, wait_until_ready};
use crate::application::services::remote::AgentExecutor;
use crate::application::services::retry::RetryPolicy;
use crate::application::services::stack::{delete_stack, ensure_stack, recreate_stack, rollback};
use crate::application::services::teardown::{TeardownTask, delete_bucket, run_teardown};
use crate::domain::error::{ConfigError, StackError};
use crate::domain::regions::aws_locations;
use crate::domain::request::{DeprovisionRequest, ProvisionRequest};
use crate::domain::stack::StackSpec;

pub const BOOTSTRAP_TEMPLATE_PATH: &str = "aws/bootstrap.template.yaml";
pub const GATEWAY_TEMPLATE_PATH: &str = "aws/gateway.template.yaml";

/// Explicit AWS configuration threaded in from `AppConfig`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsSettings {
    pub qualifier: String,
    pub bootstrap_stack: String,
}

impl AwsSettings {
    /// Name of the bootstrap stack's asset bucket in `account`/`region`.
    #[must_use]
    pub fn assets_bucket(&self, account: &str, region: &str) -> String {
        format!("cdk-{}-assets-{account}-{region}", self.qualifier)
    }
}

pub struct AwsProvisioner<S, A> {
    session: S,
    assets: A,
    settings: AwsSettings,
    retry: RetryPolicy,
    check: ReadinessCheck,
}

impl<S: AwsSession, A: AssetSource> AwsProvisioner<S, A> {
    pub fn new(session: S, assets: A, settings: AwsSettings) -> Self {
        Self {
            session,
            assets,
            settings,
            retry: RetryPolicy::default(),
            check: AGENT_CHECK,
        }
    }

    /// Overrides the retry policy used by teardown.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn check_credentials(&self, session: &S) -> Result<String> {
        session
            .caller_identity()
            .await
            .map(|identity| identity.account)
            .map_err(|e| ConfigError::MissingCredentials(format!("{e:#}")).into())
    }

    fn bootstrap_spec(&self) -> Result<StackSpec> {
        let template = self.assets.read_to_string(BOOTSTRAP_TEMPLATE_PATH)?;
        Ok(StackSpec::new(&self.settings.bootstrap_stack, template)
            .parameter("Qualifier", &self.settings.qualifier))
    }

    fn gateway_spec(&self, id: &str, request: &ProvisionRequest) -> Result<StackSpec> {
        let template = self.assets.read_to_string(GATEWAY_TEMPLATE_PATH)?;
        Ok(StackSpec::new(id, template)
            .parameter("WgPort", request.port.to_string())
            .parameter("Qualifier", &self.settings.qualifier))
    }

    /// Readiness and WireGuard setup on an instance of a created stack.
    async fn configure_instance(
        &self,
        session: &S,
        instance_id: &str,
        request: &ProvisionRequest,
        cancel: &Cancellation,
    ) -> Result<String> {
        let executor = AgentExecutor::new(session, instance_id);
        tracing::info!(instance = %instance_id, "waiting for instance to be up");
        wait_until_ready(&executor, &self.check, cancel).await?;
        tracing::info!("running init script");
        let outcome = run_init_script(&executor, &self.assets, request, cancel).await?;
        Ok(outcome.server_wg_public_key)
    }
}

fn output<'a>(
    outputs: &'a std::collections::BTreeMap<String, String>,
    stack: &str,
    key: &str,
) -> Result<&'a str> {
    outputs.get(key).map(String::as_str).ok_or_else(|| {
        StackError::MissingOutput {
            name: stack.to_string(),
            key: key.to_string(),
        }
        .into()
    })
}

impl<S: AwsSession, A: AssetSource> Provisioner for AwsProvisioner<S, A> {
    async fn provision(
        &self,
        id: &str,
        request: &ProvisionRequest,
        cancel: &Cancellation,
    ) -> Result<ProvisionResult> {
        request.validate()?;
        let session = self.session.with_region(&request.region);
        self.check_credentials(&session).await?;

        tracing::info!(stack = %self.settings.bootstrap_stack, "provisioning bootstrap stack");
        ensure_stack(&session, &self.bootstrap_spec()?, cancel).await?;

        let summary = publish_assets(&session, &self.assets, &self.settings.qualifier, cancel)
            .await
            .context("publishing assets")?;
        tracing::info!(
            uploaded = summary.uploaded.len(),
            failed = summary.failed.len(),
            skipped = summary.skipped.len(),
            "assets published"
        );

        tracing::info!(stack = %id, "provisioning gateway stack");
        let outputs = recreate_stack(&session, &self.gateway_spec(id, request)?, cancel).await?;

        let configured = async {
            let instance_id = output(&outputs, id, "InstanceId")?;
            let server_ip: IpAddr = output(&outputs, id, "ServerIp")?
                .parse()
                .with_context(|| format!("stack {id} returned an invalid ServerIp"))?;
            let key = self
                .configure_instance(&session, instance_id, request, cancel)
                .await?;
            anyhow::Ok((server_ip, key))
        }
        .await;

        match configured {
            Ok((server_ip, server_public_key)) => Ok(ProvisionResult {
                server_ip,
                server_addr: request.server_addr,
                server_public_key,
            }),
            Err(e) => {
                tracing::info!(stack = %id, "cleaning up stack");
                rollback(&session, id).await;
                Err(e)
            }
        }
    }

    async fn deprovision(
        &self,
        id: &str,
        request: &DeprovisionRequest,
        cancel: &Cancellation,
    ) -> Result<()> {
        request.validate()?;
        let session = self.session.with_region(&request.region);
        let account = self.check_credentials(&session).await?;
        let session = &session;
        let settings = &self.settings;
        let bucket = settings.assets_bucket(&account, &request.region);
        let bucket = bucket.as_str();

        let tasks = vec![
            TeardownTask::new(format!("assets bucket in {}", request.region), move || {
                Box::pin(delete_bucket(session, bucket))
            }),
            TeardownTask::new(format!("stack {}", settings.bootstrap_stack), move || {
                Box::pin(async move { delete_stack(session, &settings.bootstrap_stack, cancel).await })
            }),
            TeardownTask::new(format!("stack {id}"), move || {
                Box::pin(async move { delete_stack(session, id, cancel).await })
            }),
        ];

        run_teardown(tasks, &self.retry, cancel).await?;
        Ok(())
    }

    async fn locations(&self, _cancel: &Cancellation) -> Result<Vec<Location>> {
        Ok(aws_locations())
    }
}
