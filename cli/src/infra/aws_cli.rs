//! AWS adapter: implements the stack, object store, identity and agent ports
//! by shelling out to the `aws` CLI.
//!
//! Every call is pinned to one region with `--region` and `--output json`.
//! Assumed-role sessions pass their temporary credentials through the
//! standard `AWS_*` environment variables.

use std::collections::BTreeMap;
use std::io::Write as _;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tempfile::NamedTempFile;

use crate::application::ports::{
    CallerIdentity, CommandAgent, CommandRunner, IdentityBroker, ObjectStore, ObjectVersion,
    StackApi,
};
use crate::domain::agent::{CommandInvocation, InvocationStatus};
use crate::domain::stack::{CreateOutcome, StackDescription, StackEvent, StackSpec};

const AWS: &str = "aws";

/// Temporary credentials returned by `sts assume-role`.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Credentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .finish_non_exhaustive()
    }
}

/// One region-bound AWS session backed by the `aws` CLI.
#[derive(Debug, Clone)]
pub struct AwsCli<R> {
    runner: R,
    region: String,
    credentials: Option<Credentials>,
}

/// Raw outcome of one CLI call.
struct Reply {
    success: bool,
    stdout: String,
    stderr: String,
}

impl Reply {
    fn into_stdout(self, what: &str) -> Result<String> {
        if self.success {
            Ok(self.stdout)
        } else {
            bail!("{what} failed: {}", self.stderr.trim())
        }
    }
}

impl<R: CommandRunner + Clone> AwsCli<R> {
    pub fn new(runner: R, region: impl Into<String>) -> Self {
        Self {
            runner,
            region: region.into(),
            credentials: None,
        }
    }

    async fn invoke(&self, args: &[&str]) -> Result<Reply> {
        let mut full: Vec<&str> = args.to_vec();
        full.extend(["--region", self.region.as_str(), "--output", "json"]);

        let output = match &self.credentials {
            Some(c) => {
                let env = [
                    ("AWS_ACCESS_KEY_ID", c.access_key_id.as_str()),
                    ("AWS_SECRET_ACCESS_KEY", c.secret_access_key.as_str()),
                    ("AWS_SESSION_TOKEN", c.session_token.as_str()),
                ];
                self.runner.run_with_env(AWS, &full, &env).await?
            }
            None => self.runner.run(AWS, &full).await?,
        };
        Ok(Reply {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn invoke_json<T: serde::de::DeserializeOwned>(&self, args: &[&str], what: &str) -> Result<T> {
        let stdout = self.invoke(args).await?.into_stdout(what)?;
        parse_json(&stdout).with_context(|| format!("unexpected output from {what}"))
    }
}

/// `aws` prints nothing at all for some empty results.
fn parse_json<T: serde::de::DeserializeOwned>(stdout: &str) -> Result<T> {
    let trimmed = stdout.trim();
    let text = if trimmed.is_empty() { "{}" } else { trimmed };
    Ok(serde_json::from_str(text)?)
}

fn temp_file(contents: &[u8]) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new().context("creating temp file")?;
    file.write_all(contents).context("writing temp file")?;
    file.flush().context("flushing temp file")?;
    Ok(file)
}

fn path_str(file: &NamedTempFile) -> Result<&str> {
    file.path().to_str().context("temp path is not valid UTF-8")
}

// ── CloudFormation ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeStacksReply {
    #[serde(default)]
    stacks: Vec<StackJson>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StackJson {
    stack_status: String,
    stack_status_reason: Option<String>,
    #[serde(default)]
    outputs: Vec<OutputJson>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OutputJson {
    output_key: String,
    output_value: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StackEventsReply {
    #[serde(default)]
    stack_events: Vec<StackEventJson>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StackEventJson {
    #[serde(default)]
    logical_resource_id: String,
    #[serde(default)]
    resource_status: String,
    resource_status_reason: Option<String>,
}

impl<R: CommandRunner + Clone> StackApi for AwsCli<R> {
    async fn create_stack(&self, spec: &StackSpec) -> Result<CreateOutcome> {
        let template = temp_file(spec.template_body.as_bytes())?;
        let template_arg = format!("file://{}", path_str(&template)?);
        let parameters: Vec<BTreeMap<&str, &str>> = spec
            .parameters
            .iter()
            .map(|(k, v)| BTreeMap::from([("ParameterKey", k.as_str()), ("ParameterValue", v.as_str())]))
            .collect();
        let parameters_arg = serde_json::to_string(&parameters)?;

        let mut args = vec![
            "cloudformation",
            "create-stack",
            "--stack-name",
            spec.name.as_str(),
            "--template-body",
            template_arg.as_str(),
            "--capabilities",
            "CAPABILITY_NAMED_IAM",
        ];
        if !parameters.is_empty() {
            args.extend(["--parameters", parameters_arg.as_str()]);
        }

        let reply = self.invoke(&args).await?;
        if !reply.success && reply.stderr.contains("AlreadyExistsException") {
            return Ok(CreateOutcome::AlreadyExists);
        }
        reply.into_stdout("cloudformation create-stack")?;
        Ok(CreateOutcome::Submitted)
    }

    async fn describe_stack(&self, name: &str) -> Result<Option<StackDescription>> {
        let reply = self
            .invoke(&["cloudformation", "describe-stacks", "--stack-name", name])
            .await?;
        if !reply.success
            && reply.stderr.contains("ValidationError")
            && reply.stderr.contains("does not exist")
        {
            return Ok(None);
        }
        let stdout = reply.into_stdout("cloudformation describe-stacks")?;
        let parsed: DescribeStacksReply =
            parse_json(&stdout).context("unexpected output from describe-stacks")?;
        Ok(parsed.stacks.into_iter().next().map(|stack| {
            let mut description = StackDescription::new(&stack.stack_status);
            description.status_reason = stack.stack_status_reason;
            description.outputs = stack
                .outputs
                .into_iter()
                .map(|o| (o.output_key, o.output_value))
                .collect();
            description
        }))
    }

    async fn stack_events(&self, name: &str) -> Result<Vec<StackEvent>> {
        let parsed: StackEventsReply = self
            .invoke_json(
                &["cloudformation", "describe-stack-events", "--stack-name", name],
                "cloudformation describe-stack-events",
            )
            .await?;
        Ok(parsed
            .stack_events
            .into_iter()
            .map(|e| StackEvent {
                logical_id: e.logical_resource_id,
                status: e.resource_status,
                reason: e.resource_status_reason,
            })
            .collect())
    }

    async fn delete_stack(&self, name: &str) -> Result<()> {
        self.invoke(&["cloudformation", "delete-stack", "--stack-name", name])
            .await?
            .into_stdout("cloudformation delete-stack")?;
        Ok(())
    }
}

// ── S3 ────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListObjectsReply {
    #[serde(default)]
    contents: Vec<ObjectJson>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ObjectJson {
    key: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListVersionsReply {
    #[serde(default)]
    versions: Vec<VersionJson>,
    #[serde(default)]
    delete_markers: Vec<VersionJson>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct VersionJson {
    key: String,
    version_id: String,
}

impl<R: CommandRunner + Clone> ObjectStore for AwsCli<R> {
    async fn put_object(&self, bucket: &str, key: &str, body: &[u8]) -> Result<()> {
        let file = temp_file(body)?;
        self.invoke(&[
            "s3api",
            "put-object",
            "--bucket",
            bucket,
            "--key",
            key,
            "--body",
            path_str(&file)?,
        ])
        .await?
        .into_stdout("s3api put-object")?;
        Ok(())
    }

    async fn list_objects(&self, bucket: &str) -> Result<Option<Vec<String>>> {
        let reply = self
            .invoke(&["s3api", "list-objects-v2", "--bucket", bucket])
            .await?;
        if !reply.success && reply.stderr.contains("NoSuchBucket") {
            return Ok(None);
        }
        let stdout = reply.into_stdout("s3api list-objects-v2")?;
        let parsed: ListObjectsReply =
            parse_json(&stdout).context("unexpected output from list-objects-v2")?;
        Ok(Some(parsed.contents.into_iter().map(|o| o.key).collect()))
    }

    async fn list_object_versions(&self, bucket: &str) -> Result<Vec<ObjectVersion>> {
        let parsed: ListVersionsReply = self
            .invoke_json(
                &["s3api", "list-object-versions", "--bucket", bucket],
                "s3api list-object-versions",
            )
            .await?;
        Ok(parsed
            .versions
            .into_iter()
            .chain(parsed.delete_markers)
            .map(|v| ObjectVersion {
                key: v.key,
                version_id: v.version_id,
            })
            .collect())
    }

    async fn delete_object(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
    ) -> Result<()> {
        let mut args = vec!["s3api", "delete-object", "--bucket", bucket, "--key", key];
        if let Some(version) = version_id {
            args.extend(["--version-id", version]);
        }
        self.invoke(&args).await?.into_stdout("s3api delete-object")?;
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        self.invoke(&["s3api", "delete-bucket", "--bucket", bucket])
            .await?
            .into_stdout("s3api delete-bucket")?;
        Ok(())
    }
}

// ── STS ───────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct IdentityReply {
    account: String,
    arn: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AssumeRoleReply {
    credentials: Credentials,
}

impl<R: CommandRunner + Clone> IdentityBroker for AwsCli<R> {
    async fn caller_identity(&self) -> Result<CallerIdentity> {
        let reply: IdentityReply = self
            .invoke_json(&["sts", "get-caller-identity"], "sts get-caller-identity")
            .await?;
        Ok(CallerIdentity {
            account: reply.account,
            arn: reply.arn,
        })
    }

    async fn assume_role(&self, role_arn: &str, session_name: &str) -> Result<Self> {
        let reply: AssumeRoleReply = self
            .invoke_json(
                &[
                    "sts",
                    "assume-role",
                    "--role-arn",
                    role_arn,
                    "--role-session-name",
                    session_name,
                ],
                "sts assume-role",
            )
            .await?;
        Ok(Self {
            runner: self.runner.clone(),
            region: self.region.clone(),
            credentials: Some(reply.credentials),
        })
    }

    fn region(&self) -> &str {
        &self.region
    }

    fn with_region(&self, region: &str) -> Self {
        Self {
            runner: self.runner.clone(),
            region: region.to_string(),
            credentials: self.credentials.clone(),
        }
    }
}

// ── SSM ───────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SendCommandReply {
    command: CommandJson,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CommandJson {
    command_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InvocationReply {
    status: String,
    #[serde(default = "no_response_code")]
    response_code: i64,
    #[serde(default)]
    standard_output_content: String,
    #[serde(default)]
    standard_error_content: String,
}

fn no_response_code() -> i64 {
    -1
}

impl<R: CommandRunner + Clone> CommandAgent for AwsCli<R> {
    async fn send_command(&self, instance_id: &str, script: &str) -> Result<String> {
        let parameters = serde_json::json!({ "commands": [script] }).to_string();
        let reply: SendCommandReply = self
            .invoke_json(
                &[
                    "ssm",
                    "send-command",
                    "--document-name",
                    "AWS-RunShellScript",
                    "--instance-ids",
                    instance_id,
                    "--parameters",
                    parameters.as_str(),
                ],
                "ssm send-command",
            )
            .await?;
        Ok(reply.command.command_id)
    }

    async fn command_invocation(
        &self,
        command_id: &str,
        instance_id: &str,
    ) -> Result<CommandInvocation> {
        let reply = self
            .invoke(&[
                "ssm",
                "get-command-invocation",
                "--command-id",
                command_id,
                "--instance-id",
                instance_id,
            ])
            .await?;
        // The invocation is not visible for a moment after send-command.
        if !reply.success && reply.stderr.contains("InvocationDoesNotExist") {
            return Ok(CommandInvocation {
                status: InvocationStatus::Pending,
                response_code: no_response_code(),
                stdout: String::new(),
                stderr: String::new(),
            });
        }
        let stdout = reply.into_stdout("ssm get-command-invocation")?;
        let parsed: InvocationReply =
            parse_json(&stdout).context("unexpected output from get-command-invocation")?;
        Ok(CommandInvocation {
            status: InvocationStatus::parse(&parsed.status),
            response_code: parsed.response_code,
            stdout: parsed.standard_output_content,
            stderr: parsed.standard_error_content,
        })
    }
}
