//! Cloud assembly manifests: the deployment manifest (`manifest.json`) and the
//! asset manifest it references (`<Stack>.assets.json`).
//!
//! Both files may contain `${Service::Field}` placeholders that are expanded
//! against the caller's identity before parsing. See [`expand_placeholders`].

use std::collections::BTreeMap;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;

use crate::domain::error::AssetError;

pub const STACK_ARTIFACT_TYPE: &str = "aws:cloudformation:stack";
pub const ASSET_MANIFEST_ARTIFACT_TYPE: &str = "cdk:asset-manifest";

// ── Deployment manifest ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentManifest {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub artifacts: BTreeMap<String, Artifact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Artifact {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub properties: ArtifactProperties,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArtifactProperties {
    pub file: Option<String>,
    pub template_file: Option<String>,
    pub assume_role_arn: Option<String>,
    pub cloud_formation_execution_role_arn: Option<String>,
}

impl DeploymentManifest {
    /// # Errors
    ///
    /// Returns an error if `json` is not a valid deployment manifest.
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("invalid deployment manifest")
    }

    /// The single stack artifact, which decides the deploy role.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError`] if there is no stack artifact or more than one.
    pub fn stack_artifact(&self) -> Result<(&str, &Artifact)> {
        let mut stacks = self
            .artifacts
            .iter()
            .filter(|(_, a)| a.kind == STACK_ARTIFACT_TYPE);
        let Some((id, artifact)) = stacks.next() else {
            return Err(AssetError::MissingStackArtifact.into());
        };
        let extra = stacks.count();
        if extra > 0 {
            return Err(AssetError::AmbiguousStackArtifacts(extra + 1).into());
        }
        Ok((id.as_str(), artifact))
    }

    /// Role to assume before publishing assets for the stack artifact.
    ///
    /// # Errors
    ///
    /// Returns an error if the stack artifact is missing or names no role.
    pub fn deploy_role_arn(&self) -> Result<&str> {
        let (id, artifact) = self.stack_artifact()?;
        artifact
            .properties
            .assume_role_arn
            .as_deref()
            .with_context(|| format!("stack artifact {id} has no assumeRoleArn"))
    }

    /// Path (relative to the cloud assembly) of the asset manifest.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::MissingAssetManifest`] if none is declared.
    pub fn asset_manifest_file(&self) -> Result<&str> {
        self.artifacts
            .values()
            .filter(|a| a.kind == ASSET_MANIFEST_ARTIFACT_TYPE)
            .find_map(|a| a.properties.file.as_deref())
            .ok_or_else(|| AssetError::MissingAssetManifest.into())
    }
}

// ── Asset manifest ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct AssetManifest {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub files: BTreeMap<String, AssetFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetFile {
    pub source: AssetSource,
    #[serde(default)]
    pub destinations: BTreeMap<String, AssetDestination>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetSource {
    pub path: String,
    pub packaging: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDestination {
    pub bucket_name: String,
    pub object_key: String,
    pub assume_role_arn: String,
}

/// How an asset's source path is turned into upload bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packaging {
    /// Recursively zip a directory, entry names relative to it.
    Zip,
    /// Upload a single file verbatim.
    File,
}

impl AssetSource {
    /// # Errors
    ///
    /// Returns [`AssetError::UnknownPackaging`] for anything but `zip` or `file`.
    pub fn packaging(&self) -> Result<Packaging, AssetError> {
        match self.packaging.as_str() {
            "zip" => Ok(Packaging::Zip),
            "file" => Ok(Packaging::File),
            other => Err(AssetError::UnknownPackaging(other.to_string())),
        }
    }
}

impl AssetManifest {
    /// # Errors
    ///
    /// Returns an error if `json` is not a valid asset manifest.
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("invalid asset manifest")
    }
}

// ── Placeholder expansion ────────────────────────────────────────────────────

/// Values substituted into `${Service::Field}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderValues {
    pub account_id: String,
    pub region: String,
    pub partition: String,
    pub qualifier: String,
}

static PLACEHOLDER: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z0-9]+)::([A-Za-z0-9]+)\}"));

/// Replaces known placeholders (`AWS::AccountId`, `AWS::Region`,
/// `AWS::Partition`, `Cdk::Qualifier`). Unknown ones are left verbatim.
///
/// # Errors
///
/// Returns an error only if the placeholder pattern fails to compile.
pub fn expand_placeholders(text: &str, values: &PlaceholderValues) -> Result<String> {
    let re = PLACEHOLDER
        .as_ref()
        .map_err(|e| anyhow::anyhow!("placeholder pattern: {e}"))?;
    let expanded = re.replace_all(text, |caps: &regex::Captures<'_>| {
        let known = match (&caps[1], &caps[2]) {
            ("AWS", "AccountId") => Some(values.account_id.as_str()),
            ("AWS", "Region") => Some(values.region.as_str()),
            ("AWS", "Partition") => Some(values.partition.as_str()),
            ("Cdk", "Qualifier") => Some(values.qualifier.as_str()),
            _ => None,
        };
        known.map_or_else(|| caps[0].to_string(), str::to_string)
    });
    Ok(expanded.into_owned())
}
