//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` and the cancellation signal,
//! never from `crate::infra`, `crate::commands`, or `crate::output`.

use std::net::IpAddr;
use std::process::Output;
use std::time::Duration;

use anyhow::Result;
use tunnelgate_common::{Location, ProvisionResult};

use crate::application::cancel::Cancellation;
use crate::domain::agent::CommandInvocation;
use crate::domain::config::AppConfig;
use crate::domain::hetzner::{FirewallRule, NamedResource, ServerRecord};
use crate::domain::request::{DeprovisionRequest, ProvisionRequest};
use crate::domain::stack::{CreateOutcome, StackDescription, StackEvent, StackSpec};

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output, using the runner's default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output>;
    /// Run a program with extra environment variables (e.g. assumed-role credentials).
    async fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<Output>;
    /// Run a program with stdin piped from `input`.
    async fn run_with_stdin(&self, program: &str, args: &[&str], input: &[u8]) -> Result<Output>;
}

impl<T: CommandRunner> CommandRunner for &T {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        (**self).run(program, args).await
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output> {
        (**self).run_with_timeout(program, args, timeout).await
    }

    async fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<Output> {
        (**self).run_with_env(program, args, env).await
    }

    async fn run_with_stdin(&self, program: &str, args: &[&str], input: &[u8]) -> Result<Output> {
        (**self).run_with_stdin(program, args, input).await
    }
}

// ── Remote execution ──────────────────────────────────────────────────────────

/// Captured output of a remote script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs a shell script on a provisioned host.
///
/// On failure the error is (or wraps) `RemoteError::CommandFailed`, which
/// still carries stdout and stderr.
#[allow(async_fn_in_trait)]
pub trait RemoteExecutor {
    async fn run(&self, script: &str, cancel: &Cancellation) -> Result<RemoteOutput>;
}

// ── AWS ports ─────────────────────────────────────────────────────────────────

/// CloudFormation stack CRUD.
#[allow(async_fn_in_trait)]
pub trait StackApi {
    /// Submit a new stack. An existing stack of the same name is reported, not an error.
    async fn create_stack(&self, spec: &StackSpec) -> Result<CreateOutcome>;
    /// `None` when the stack does not exist.
    async fn describe_stack(&self, name: &str) -> Result<Option<StackDescription>>;
    async fn stack_events(&self, name: &str) -> Result<Vec<StackEvent>>;
    /// Request deletion; does not wait.
    async fn delete_stack(&self, name: &str) -> Result<()>;
}

/// One object version or delete marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectVersion {
    pub key: String,
    pub version_id: String,
}

/// S3 object and bucket operations.
#[allow(async_fn_in_trait)]
pub trait ObjectStore {
    async fn put_object(&self, bucket: &str, key: &str, body: &[u8]) -> Result<()>;
    /// Current object keys, or `None` if the bucket does not exist.
    async fn list_objects(&self, bucket: &str) -> Result<Option<Vec<String>>>;
    /// All versions and delete markers.
    async fn list_object_versions(&self, bucket: &str) -> Result<Vec<ObjectVersion>>;
    async fn delete_object(&self, bucket: &str, key: &str, version_id: Option<&str>)
    -> Result<()>;
    async fn delete_bucket(&self, bucket: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub account: String,
    pub arn: String,
}

/// STS identity and role assumption.
///
/// A session is bound to one region and one credential set; assuming a role
/// yields a new session of the same kind.
#[allow(async_fn_in_trait)]
pub trait IdentityBroker: Sized {
    async fn caller_identity(&self) -> Result<CallerIdentity>;
    async fn assume_role(&self, role_arn: &str, session_name: &str) -> Result<Self>;
    fn region(&self) -> &str;
    /// The same credentials, bound to `region`.
    #[must_use]
    fn with_region(&self, region: &str) -> Self;
}

/// SSM command dispatch.
#[allow(async_fn_in_trait)]
pub trait CommandAgent {
    /// Returns the command id.
    async fn send_command(&self, instance_id: &str, script: &str) -> Result<String>;
    async fn command_invocation(
        &self,
        command_id: &str,
        instance_id: &str,
    ) -> Result<CommandInvocation>;
}

/// Composite trait: everything the AWS backend needs from one session.
pub trait AwsSession: StackApi + ObjectStore + IdentityBroker + CommandAgent {}

impl<T> AwsSession for T where T: StackApi + ObjectStore + IdentityBroker + CommandAgent {}

// ── Hetzner ports ─────────────────────────────────────────────────────────────

/// Parameters for `hcloud server create`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSpec<'a> {
    pub name: &'a str,
    pub image: &'a str,
    pub server_type: &'a str,
    pub location: &'a str,
    pub ssh_key: &'a str,
    pub firewall: &'a str,
}

/// Hetzner Cloud resources addressed by name.
#[allow(async_fn_in_trait)]
pub trait CloudServers {
    async fn find_ssh_key(&self, name: &str) -> Result<Option<NamedResource>>;
    async fn create_ssh_key(&self, name: &str, public_key: &str) -> Result<()>;
    async fn delete_ssh_key(&self, name: &str) -> Result<()>;

    async fn find_firewall(&self, name: &str) -> Result<Option<NamedResource>>;
    async fn create_firewall(&self, name: &str, rules: &[FirewallRule]) -> Result<()>;
    async fn replace_firewall_rules(&self, name: &str, rules: &[FirewallRule]) -> Result<()>;
    async fn delete_firewall(&self, name: &str) -> Result<()>;

    async fn find_server(&self, name: &str) -> Result<Option<ServerRecord>>;
    async fn create_server(&self, spec: &ServerSpec<'_>) -> Result<()>;
    async fn delete_server(&self, name: &str) -> Result<()>;

    async fn locations(&self) -> Result<Vec<Location>>;
}

/// An SSH key pair usable for one provisioning run.
pub trait SshIdentity {
    /// Public key in `authorized_keys` format.
    fn authorized_key(&self) -> &str;
}

/// Ephemeral SSH key generation and script execution as `root`.
#[allow(async_fn_in_trait)]
pub trait SshTransport {
    type Identity: SshIdentity;

    async fn generate_identity(&self) -> Result<Self::Identity>;
    /// Runs `script` on `host`. Host keys are not verified.
    async fn exec(
        &self,
        identity: &Self::Identity,
        host: IpAddr,
        script: &str,
        cancel: &Cancellation,
    ) -> Result<RemoteOutput>;
}

// ── Local ports ───────────────────────────────────────────────────────────────

/// Read-only access to the bundled scripts, templates and cloud assembly.
/// Paths are relative to the asset root and use `/`.
pub trait AssetSource {
    fn read_file(&self, path: &str) -> Result<Vec<u8>>;
    fn read_to_string(&self, path: &str) -> Result<String>;
    /// Every file below `dir`, recursively, sorted.
    fn list_files(&self, dir: &str) -> Result<Vec<String>>;
}

/// Abstracts loading the user configuration.
pub trait ConfigStore {
    /// Load the configuration, falling back to defaults when no file exists.
    fn load(&self) -> Result<AppConfig>;
    /// Path of the configuration file.
    fn path(&self) -> Result<std::path::PathBuf>;
}

// ── Provisioner ───────────────────────────────────────────────────────────────

/// The contract both backends implement.
#[allow(async_fn_in_trait)]
pub trait Provisioner {
    /// Bring a gateway named `id` up and configure WireGuard on it.
    async fn provision(
        &self,
        id: &str,
        request: &ProvisionRequest,
        cancel: &Cancellation,
    ) -> Result<ProvisionResult>;
    /// Remove everything `provision` created. Every task is attempted.
    async fn deprovision(
        &self,
        id: &str,
        request: &DeprovisionRequest,
        cancel: &Cancellation,
    ) -> Result<()>;
    async fn locations(&self, cancel: &Cancellation) -> Result<Vec<Location>>;
}
