//! Shared test doubles for service tests.
//!
//! `StaticAssets` serves in-memory files (seeded with the real `init.sh`),
//! `ScriptedStacks` replays a list of stack statuses, and `FakeAws` records
//! role assumptions and S3 calls across assumed sessions.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use anyhow::{Result, anyhow, bail};

use crate::application::ports::{
    AssetSource, CallerIdentity, IdentityBroker, ObjectStore, ObjectVersion, StackApi,
};
use crate::domain::stack::{CreateOutcome, StackDescription, StackEvent, StackSpec};

/// Extracts the output separator from a rendered `init.sh`.
pub fn sentinel_in(script: &str) -> Option<&str> {
    script
        .lines()
        .find_map(|line| line.strip_prefix("OUTPUT_SEPARATOR='"))
        .and_then(|rest| rest.strip_suffix('\''))
}

// ── StaticAssets ──────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct StaticAssets {
    files: BTreeMap<String, Vec<u8>>,
}

impl Default for StaticAssets {
    fn default() -> Self {
        let files = BTreeMap::from([(
            "init.sh".to_string(),
            include_bytes!("../../../assets/init.sh").to_vec(),
        )]);
        Self { files }
    }
}

impl StaticAssets {
    pub fn with(mut self, path: &str, content: &str) -> Self {
        self.files.insert(path.to_string(), content.as_bytes().to_vec());
        self
    }
}

impl AssetSource for StaticAssets {
    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("asset not found: {path}"))
    }

    fn read_to_string(&self, path: &str) -> Result<String> {
        Ok(String::from_utf8(self.read_file(path)?)?)
    }

    fn list_files(&self, dir: &str) -> Result<Vec<String>> {
        let prefix = format!("{dir}/");
        Ok(self
            .files
            .keys()
            .filter(|k| k.starts_with(&prefix))
            .cloned()
            .collect())
    }
}

// ── ScriptedStacks ────────────────────────────────────────────────────────────

/// Replays describe results in order: a status string, `-` for an absent
/// stack, or `!message` for an API error.
pub struct ScriptedStacks {
    script: RefCell<Vec<String>>,
    outputs: BTreeMap<String, String>,
    events: Vec<StackEvent>,
    already_exists: bool,
    calls: RefCell<Vec<&'static str>>,
}

impl ScriptedStacks {
    pub fn new(statuses: &[&str]) -> Self {
        Self {
            script: RefCell::new(statuses.iter().rev().map(|s| (*s).to_string()).collect()),
            outputs: BTreeMap::new(),
            events: Vec::new(),
            already_exists: false,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn with_outputs(mut self, outputs: &[(&str, &str)]) -> Self {
        self.outputs = outputs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        self
    }

    pub fn with_events(mut self, events: Vec<StackEvent>) -> Self {
        self.events = events;
        self
    }

    pub fn already_exists(mut self) -> Self {
        self.already_exists = true;
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }

    pub fn deletes(&self) -> usize {
        self.calls.borrow().iter().filter(|c| **c == "delete").count()
    }

    pub fn creates(&self) -> usize {
        self.calls.borrow().iter().filter(|c| **c == "create").count()
    }
}

impl StackApi for ScriptedStacks {
    async fn create_stack(&self, _: &StackSpec) -> Result<CreateOutcome> {
        self.calls.borrow_mut().push("create");
        Ok(if self.already_exists {
            CreateOutcome::AlreadyExists
        } else {
            CreateOutcome::Submitted
        })
    }

    async fn describe_stack(&self, _: &str) -> Result<Option<StackDescription>> {
        self.calls.borrow_mut().push("describe");
        let Some(next) = self.script.borrow_mut().pop() else {
            bail!("describe script exhausted");
        };
        if next == "-" {
            return Ok(None);
        }
        if let Some(message) = next.strip_prefix('!') {
            bail!("{message}");
        }
        let mut description = StackDescription::new(&next);
        description.outputs = self.outputs.clone();
        Ok(Some(description))
    }

    async fn stack_events(&self, _: &str) -> Result<Vec<StackEvent>> {
        self.calls.borrow_mut().push("events");
        Ok(self.events.clone())
    }

    async fn delete_stack(&self, _: &str) -> Result<()> {
        self.calls.borrow_mut().push("delete");
        Ok(())
    }
}

// ── FakeAws ───────────────────────────────────────────────────────────────────

#[derive(Default)]
struct AwsState {
    assumed_roles: Vec<String>,
    puts: Vec<(String, String, Vec<u8>)>,
    failing_buckets: BTreeSet<String>,
    buckets: BTreeMap<String, Vec<String>>,
    deleted_objects: Vec<(String, Option<String>)>,
    deleted_buckets: Vec<String>,
}

/// Identity and object store fake. Assumed sessions share the same state.
#[derive(Clone, Default)]
pub struct FakeAws {
    state: Rc<RefCell<AwsState>>,
}

impl FakeAws {
    pub fn failing_bucket(self, bucket: &str) -> Self {
        self.state.borrow_mut().failing_buckets.insert(bucket.to_string());
        self
    }

    pub fn with_bucket(self, bucket: &str, keys: &[&str]) -> Self {
        self.state.borrow_mut().buckets.insert(
            bucket.to_string(),
            keys.iter().map(|k| (*k).to_string()).collect(),
        );
        self
    }

    pub fn assumed_roles(&self) -> Vec<String> {
        self.state.borrow().assumed_roles.clone()
    }

    pub fn puts(&self) -> Vec<(String, String, Vec<u8>)> {
        self.state.borrow().puts.clone()
    }

    pub fn deleted_objects(&self) -> Vec<(String, Option<String>)> {
        self.state.borrow().deleted_objects.clone()
    }

    pub fn deleted_buckets(&self) -> Vec<String> {
        self.state.borrow().deleted_buckets.clone()
    }
}

impl IdentityBroker for FakeAws {
    async fn caller_identity(&self) -> Result<CallerIdentity> {
        Ok(CallerIdentity {
            account: "123456789012".to_string(),
            arn: "arn:aws:iam::123456789012:user/ops".to_string(),
        })
    }

    async fn assume_role(&self, role_arn: &str, _: &str) -> Result<Self> {
        self.state.borrow_mut().assumed_roles.push(role_arn.to_string());
        Ok(self.clone())
    }

    fn region(&self) -> &str {
        "eu-central-1"
    }

    fn with_region(&self, _: &str) -> Self {
        self.clone()
    }
}

impl ObjectStore for FakeAws {
    async fn put_object(&self, bucket: &str, key: &str, body: &[u8]) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.failing_buckets.contains(bucket) {
            bail!("AccessDenied: {bucket}");
        }
        state.puts.push((bucket.to_string(), key.to_string(), body.to_vec()));
        Ok(())
    }

    async fn list_objects(&self, bucket: &str) -> Result<Option<Vec<String>>> {
        Ok(self.state.borrow().buckets.get(bucket).cloned())
    }

    async fn list_object_versions(&self, bucket: &str) -> Result<Vec<ObjectVersion>> {
        let state = self.state.borrow();
        Ok(state
            .buckets
            .get(bucket)
            .into_iter()
            .flatten()
            .map(|key| ObjectVersion {
                key: key.clone(),
                version_id: "v1".to_string(),
            })
            .collect())
    }

    async fn delete_object(&self, _: &str, key: &str, version_id: Option<&str>) -> Result<()> {
        self.state
            .borrow_mut()
            .deleted_objects
            .push((key.to_string(), version_id.map(str::to_string)));
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.buckets.remove(bucket);
        state.deleted_buckets.push(bucket.to_string());
        Ok(())
    }
}
