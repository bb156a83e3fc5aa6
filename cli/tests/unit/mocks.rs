//! Shared fakes for unit tests.
//!
//! `FakeAws` and `FakeHetzner` keep a small in-memory model of the cloud so
//! whole provisioning runs can be replayed: stacks, buckets, servers, and a
//! remote shell that answers the readiness check and the init script.

#![allow(clippy::expect_used, dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;
use std::rc::Rc;

use anyhow::{Result, bail};
use tunnelgate::application::cancel::Cancellation;
use tunnelgate::application::ports::{
    CallerIdentity, CloudServers, CommandAgent, IdentityBroker, ObjectStore, ObjectVersion,
    RemoteOutput, ServerSpec, SshIdentity, SshTransport, StackApi,
};
use tunnelgate::domain::agent::{CommandInvocation, InvocationStatus};
use tunnelgate::domain::error::RemoteError;
use tunnelgate::domain::hetzner::{
    FirewallRule, Ipv4Record, NamedResource, PublicNet, ServerRecord,
};
use tunnelgate::domain::stack::{CreateOutcome, StackDescription, StackEvent, StackSpec};
use tunnelgate_common::Location;

pub const CLIENT_KEY: &str = "AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8=";
pub const ACCOUNT: &str = "123456789012";
pub const SERVER_KEY: &str = "SERVERKEY";
pub const AWS_SERVER_IP: &str = "198.51.100.20";
pub const HETZNER_SERVER_IP: &str = "203.0.113.30";

/// Extracts the output separator from a rendered `init.sh`.
pub fn sentinel_in(script: &str) -> Option<&str> {
    script
        .lines()
        .find_map(|line| line.strip_prefix("OUTPUT_SEPARATOR='"))
        .and_then(|rest| rest.strip_suffix('\''))
}

/// What a configured gateway prints for the init script.
fn init_script_stdout(script: &str) -> Option<String> {
    sentinel_in(script).map(|sentinel| {
        format!(
            "[init] installing wireguard-tools\n{sentinel}\n{{\"ServerWgPublicKey\":\"{SERVER_KEY}\"}}\n"
        )
    })
}

// ── AWS ───────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct AwsState {
    /// Live stacks and their outputs.
    pub stacks: BTreeMap<String, BTreeMap<String, String>>,
    /// `create <name>` / `delete <name>` in call order.
    pub stack_log: Vec<String>,
    pub buckets: BTreeMap<String, BTreeSet<String>>,
    pub failing_bucket_deletes: u32,
    pub puts: Vec<(String, String)>,
    pub assumed_roles: Vec<String>,
    pub scripts: BTreeMap<String, String>,
    pub init_script_fails: bool,
    pub no_credentials: bool,
    pub identity_calls: u32,
    pub regions_used: BTreeSet<String>,
}

#[derive(Clone)]
pub struct FakeAws {
    pub state: Rc<RefCell<AwsState>>,
    region: String,
}

impl Default for FakeAws {
    fn default() -> Self {
        Self {
            state: Rc::new(RefCell::new(AwsState::default())),
            region: "us-east-1".to_string(),
        }
    }
}

impl FakeAws {
    pub fn with_failing_init(self) -> Self {
        self.state.borrow_mut().init_script_fails = true;
        self
    }

    pub fn without_credentials(self) -> Self {
        self.state.borrow_mut().no_credentials = true;
        self
    }

    /// Every bucket deletion fails `times` more times.
    pub fn failing_bucket_deletes(self, times: u32) -> Self {
        self.state.borrow_mut().failing_bucket_deletes = times;
        self
    }

    pub fn stack_log(&self) -> Vec<String> {
        self.state.borrow().stack_log.clone()
    }

    fn outputs_for(name: &str) -> BTreeMap<String, String> {
        if name.ends_with("bootstrap") {
            return BTreeMap::from([("BucketName".to_string(), "bucket".to_string())]);
        }
        BTreeMap::from([
            ("InstanceId".to_string(), format!("i-{name}")),
            ("ServerIp".to_string(), AWS_SERVER_IP.to_string()),
        ])
    }
}

impl StackApi for FakeAws {
    async fn create_stack(&self, spec: &StackSpec) -> Result<CreateOutcome> {
        let mut state = self.state.borrow_mut();
        state.regions_used.insert(self.region.clone());
        if state.stacks.contains_key(&spec.name) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        state.stack_log.push(format!("create {}", spec.name));
        state
            .stacks
            .insert(spec.name.clone(), Self::outputs_for(&spec.name));
        if spec.name.ends_with("bootstrap") {
            let bucket = format!("cdk-hnb659fds-assets-{ACCOUNT}-{}", self.region);
            state.buckets.entry(bucket).or_default();
        }
        Ok(CreateOutcome::Submitted)
    }

    async fn describe_stack(&self, name: &str) -> Result<Option<StackDescription>> {
        Ok(self.state.borrow().stacks.get(name).map(|outputs| {
            let mut description = StackDescription::new("CREATE_COMPLETE");
            description.outputs = outputs.clone();
            description
        }))
    }

    async fn stack_events(&self, _name: &str) -> Result<Vec<StackEvent>> {
        Ok(Vec::new())
    }

    async fn delete_stack(&self, name: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.stacks.remove(name).is_some() {
            state.stack_log.push(format!("delete {name}"));
        }
        Ok(())
    }
}

impl ObjectStore for FakeAws {
    async fn put_object(&self, bucket: &str, key: &str, _body: &[u8]) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let Some(objects) = state.buckets.get_mut(bucket) else {
            bail!("NoSuchBucket: {bucket}");
        };
        objects.insert(key.to_string());
        state.puts.push((bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn list_objects(&self, bucket: &str) -> Result<Option<Vec<String>>> {
        Ok(self
            .state
            .borrow()
            .buckets
            .get(bucket)
            .map(|objects| objects.iter().cloned().collect()))
    }

    async fn list_object_versions(&self, _bucket: &str) -> Result<Vec<ObjectVersion>> {
        Ok(Vec::new())
    }

    async fn delete_object(&self, bucket: &str, key: &str, _version: Option<&str>) -> Result<()> {
        if let Some(objects) = self.state.borrow_mut().buckets.get_mut(bucket) {
            objects.remove(key);
        }
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.failing_bucket_deletes > 0 {
            state.failing_bucket_deletes -= 1;
            bail!("BucketNotEmpty: {bucket}");
        }
        state.buckets.remove(bucket);
        Ok(())
    }
}

impl IdentityBroker for FakeAws {
    async fn caller_identity(&self) -> Result<CallerIdentity> {
        let mut state = self.state.borrow_mut();
        state.identity_calls += 1;
        if state.no_credentials {
            bail!("Unable to locate credentials");
        }
        Ok(CallerIdentity {
            account: ACCOUNT.to_string(),
            arn: format!("arn:aws:iam::{ACCOUNT}:user/dev"),
        })
    }

    async fn assume_role(&self, role_arn: &str, _session_name: &str) -> Result<Self> {
        self.state.borrow_mut().assumed_roles.push(role_arn.to_string());
        Ok(self.clone())
    }

    fn region(&self) -> &str {
        &self.region
    }

    fn with_region(&self, region: &str) -> Self {
        Self {
            state: Rc::clone(&self.state),
            region: region.to_string(),
        }
    }
}

impl CommandAgent for FakeAws {
    async fn send_command(&self, _instance_id: &str, script: &str) -> Result<String> {
        let mut state = self.state.borrow_mut();
        let id = format!("cmd-{}", state.scripts.len());
        state.scripts.insert(id.clone(), script.to_string());
        Ok(id)
    }

    async fn command_invocation(
        &self,
        command_id: &str,
        _instance_id: &str,
    ) -> Result<CommandInvocation> {
        let state = self.state.borrow();
        let script = state.scripts.get(command_id).cloned().unwrap_or_default();
        let done = |code: i64, stdout: String| CommandInvocation {
            status: if code == 0 {
                InvocationStatus::Success
            } else {
                InvocationStatus::Failed
            },
            response_code: code,
            stdout,
            stderr: String::new(),
        };
        if script == "printf 1" {
            return Ok(done(0, "1".to_string()));
        }
        if state.init_script_fails {
            return Ok(done(1, "dnf: no network".to_string()));
        }
        Ok(init_script_stdout(&script).map_or_else(|| done(127, String::new()), |out| done(0, out)))
    }
}

// ── Hetzner ───────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct HetznerState {
    pub ssh_keys: BTreeMap<String, String>,
    pub firewalls: BTreeMap<String, Vec<FirewallRule>>,
    pub servers: BTreeMap<String, ServerRecord>,
    /// Describe calls left before a new server reports `running`.
    pub boot_polls: u32,
    pub log: Vec<String>,
    pub scripts: Vec<String>,
    pub next_id: u64,
}

#[derive(Clone, Default)]
pub struct FakeHetzner {
    pub state: Rc<RefCell<HetznerState>>,
}

impl FakeHetzner {
    pub fn booting_for(self, polls: u32) -> Self {
        self.state.borrow_mut().boot_polls = polls;
        self
    }

    pub fn log(&self) -> Vec<String> {
        self.state.borrow().log.clone()
    }
}

fn named(id: u64, name: &str) -> NamedResource {
    NamedResource {
        id,
        name: name.to_string(),
    }
}

impl CloudServers for FakeHetzner {
    async fn find_ssh_key(&self, name: &str) -> Result<Option<NamedResource>> {
        Ok(self.state.borrow().ssh_keys.contains_key(name).then(|| named(1, name)))
    }

    async fn create_ssh_key(&self, name: &str, public_key: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.ssh_keys.contains_key(name) {
            bail!("uniqueness_error: SSH key with the same name already exists");
        }
        state.log.push(format!("create ssh-key {name}"));
        state.ssh_keys.insert(name.to_string(), public_key.to_string());
        Ok(())
    }

    async fn delete_ssh_key(&self, name: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.log.push(format!("delete ssh-key {name}"));
        state.ssh_keys.remove(name);
        Ok(())
    }

    async fn find_firewall(&self, name: &str) -> Result<Option<NamedResource>> {
        Ok(self.state.borrow().firewalls.contains_key(name).then(|| named(2, name)))
    }

    async fn create_firewall(&self, name: &str, rules: &[FirewallRule]) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.log.push(format!("create firewall {name}"));
        state.firewalls.insert(name.to_string(), rules.to_vec());
        Ok(())
    }

    async fn replace_firewall_rules(&self, name: &str, rules: &[FirewallRule]) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.log.push(format!("replace-rules firewall {name}"));
        state.firewalls.insert(name.to_string(), rules.to_vec());
        Ok(())
    }

    async fn delete_firewall(&self, name: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.servers.values().any(|s| s.name == name) {
            bail!("resource_in_use: firewall {name} is still applied");
        }
        state.log.push(format!("delete firewall {name}"));
        state.firewalls.remove(name);
        Ok(())
    }

    async fn find_server(&self, name: &str) -> Result<Option<ServerRecord>> {
        let mut state = self.state.borrow_mut();
        let booting = state.boot_polls > 0;
        if booting {
            state.boot_polls -= 1;
        }
        Ok(state.servers.get(name).cloned().map(|mut server| {
            if !booting {
                "running".clone_into(&mut server.status);
            }
            server
        }))
    }

    async fn create_server(&self, spec: &ServerSpec<'_>) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if !state.ssh_keys.contains_key(spec.ssh_key) || !state.firewalls.contains_key(spec.firewall) {
            bail!("server references a missing ssh key or firewall");
        }
        state.next_id += 1;
        let id = state.next_id;
        state.log.push(format!("create server {}", spec.name));
        state.servers.insert(
            spec.name.to_string(),
            ServerRecord {
                id,
                name: spec.name.to_string(),
                status: "initializing".to_string(),
                public_net: PublicNet {
                    ipv4: Some(Ipv4Record {
                        ip: HETZNER_SERVER_IP.parse().expect("ip"),
                    }),
                },
            },
        );
        Ok(())
    }

    async fn delete_server(&self, name: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.log.push(format!("delete server {name}"));
        state.servers.remove(name);
        Ok(())
    }

    async fn locations(&self) -> Result<Vec<Location>> {
        Ok(vec![Location {
            key: "fsn1".to_string(),
            city: "Falkenstein".to_string(),
            country: "DE".to_string(),
            latitude: 50.47612,
            longitude: 12.370071,
        }])
    }
}

pub struct FakeKey(String);

impl SshIdentity for FakeKey {
    fn authorized_key(&self) -> &str {
        &self.0
    }
}

/// SSH that answers `echo 1` once the host has been polled `refusals` times.
#[derive(Clone, Default)]
pub struct FakeSsh {
    pub refusals: Rc<RefCell<u32>>,
    pub scripts: Rc<RefCell<Vec<(IpAddr, String)>>>,
}

impl FakeSsh {
    pub fn refusing(times: u32) -> Self {
        Self {
            refusals: Rc::new(RefCell::new(times)),
            scripts: Rc::default(),
        }
    }
}

impl SshTransport for FakeSsh {
    type Identity = FakeKey;

    async fn generate_identity(&self) -> Result<FakeKey> {
        Ok(FakeKey("ssh-ed25519 AAAATEST tunnelgate".to_string()))
    }

    async fn exec(
        &self,
        _identity: &FakeKey,
        host: IpAddr,
        script: &str,
        _cancel: &Cancellation,
    ) -> Result<RemoteOutput> {
        self.scripts.borrow_mut().push((host, script.to_string()));
        {
            let mut refusals = self.refusals.borrow_mut();
            if *refusals > 0 {
                *refusals -= 1;
                return Err(RemoteError::CommandFailed {
                    reason: "exited with code 255".to_string(),
                    stdout: String::new(),
                    stderr: "Connection refused".to_string(),
                }
                .into());
            }
        }
        if script == "echo 1" {
            return Ok(RemoteOutput {
                stdout: "1\n".to_string(),
                stderr: String::new(),
            });
        }
        match init_script_stdout(script) {
            Some(stdout) => Ok(RemoteOutput {
                stdout,
                stderr: String::new(),
            }),
            None => bail!("unexpected script"),
        }
    }
}
