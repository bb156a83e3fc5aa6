//! Publishes the cloud assembly's file assets to S3 before the gateway stack
//! is created, the way `cdk deploy` does.
//!
//! Flow: load `manifest.json` → assume the stack's deploy role → load the
//! asset manifest → package each asset → for every destination assume its
//! publishing role and upload.

use std::io::{Cursor, Write as _};

use anyhow::{Context, Result};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::application::cancel::Cancellation;
use crate::application::ports::{AssetSource, IdentityBroker, ObjectStore};
use crate::domain::error::is_cancelled;
use crate::domain::manifest::{
    AssetDestination, AssetManifest, DeploymentManifest, Packaging, PlaceholderValues,
    expand_placeholders,
};

/// Directory of the cloud assembly inside the bundled assets.
pub const CLOUD_ASSEMBLY_DIR: &str = "aws/cdk.out";

const DEPLOY_SESSION_NAME: &str = "tunnelgate-deploy";
const UPLOAD_SESSION_NAME: &str = "tunnelgate-asset-upload";

/// What happened to each asset and destination.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PublishSummary {
    /// `s3://bucket/key` of every successful upload.
    pub uploaded: Vec<String>,
    /// `s3://bucket/key` of every destination that failed.
    pub failed: Vec<String>,
    /// Asset ids that could not be packaged.
    pub skipped: Vec<String>,
}

/// Publishes every asset of the bundled cloud assembly.
///
/// # Errors
///
/// Fails on an unreadable or contract-violating manifest, an unknown
/// packaging type, a failure to assume the deploy role, or cancellation.
/// Single destination failures are reported in the summary instead.
pub async fn publish_assets<S>(
    session: &S,
    assets: &impl AssetSource,
    qualifier: &str,
    cancel: &Cancellation,
) -> Result<PublishSummary>
where
    S: IdentityBroker + ObjectStore,
{
    let identity = session
        .caller_identity()
        .await
        .context("resolving caller identity")?;
    let values = PlaceholderValues {
        account_id: identity.account,
        region: session.region().to_string(),
        partition: "aws".to_string(),
        qualifier: qualifier.to_string(),
    };

    let manifest_json = load_expanded(assets, "manifest.json", &values)?;
    let manifest = DeploymentManifest::parse(&manifest_json)?;
    let deploy_role = manifest.deploy_role_arn()?;

    tracing::info!(role = %deploy_role, "assuming deploy role");
    cancel.check()?;
    let deploy_session = session
        .assume_role(deploy_role, DEPLOY_SESSION_NAME)
        .await
        .with_context(|| format!("assuming deploy role {deploy_role}"))?;

    let asset_manifest_json = load_expanded(assets, manifest.asset_manifest_file()?, &values)?;
    let asset_manifest = AssetManifest::parse(&asset_manifest_json)?;

    let mut summary = PublishSummary::default();
    for (id, file) in &asset_manifest.files {
        let packaging = file.source.packaging()?;
        let body = match package(assets, packaging, &file.source.path) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(asset = %id, error = %format!("{e:#}"), "failed to package asset");
                summary.skipped.push(id.clone());
                continue;
            }
        };

        for destination in file.destinations.values() {
            cancel.check()?;
            let target = format!("s3://{}/{}", destination.bucket_name, destination.object_key);
            match upload(&deploy_session, destination, &body).await {
                Ok(()) => summary.uploaded.push(target),
                Err(e) if is_cancelled(&e) => return Err(e),
                Err(e) => {
                    tracing::error!(%target, error = %format!("{e:#}"), "failed to upload asset");
                    summary.failed.push(target);
                }
            }
        }
    }
    Ok(summary)
}

fn load_expanded(
    assets: &impl AssetSource,
    file: &str,
    values: &PlaceholderValues,
) -> Result<String> {
    let path = format!("{CLOUD_ASSEMBLY_DIR}/{file}");
    let raw = assets.read_to_string(&path)?;
    expand_placeholders(&raw, values).with_context(|| format!("expanding {path}"))
}

async fn upload<S>(deploy_session: &S, destination: &AssetDestination, body: &[u8]) -> Result<()>
where
    S: IdentityBroker + ObjectStore,
{
    let publisher = deploy_session
        .assume_role(&destination.assume_role_arn, UPLOAD_SESSION_NAME)
        .await
        .with_context(|| format!("assuming publishing role {}", destination.assume_role_arn))?;
    tracing::info!(bucket = %destination.bucket_name, key = %destination.object_key, "uploading asset");
    publisher
        .put_object(&destination.bucket_name, &destination.object_key, body)
        .await
}

/// Turns an asset source path (relative to the cloud assembly) into upload bytes.
///
/// # Errors
///
/// Returns an error if the files cannot be read or zipped.
pub fn package(assets: &impl AssetSource, packaging: Packaging, path: &str) -> Result<Vec<u8>> {
    let full = format!("{CLOUD_ASSEMBLY_DIR}/{path}");
    match packaging {
        Packaging::File => assets.read_file(&full),
        Packaging::Zip => {
            let prefix = format!("{full}/");
            let files = assets.list_files(&full)?;
            let mut entries = Vec::with_capacity(files.len());
            for file in files {
                let name = file.strip_prefix(&prefix).unwrap_or(&file).to_string();
                let body = assets.read_file(&file)?;
                entries.push((name, body));
            }
            zip_entries(&entries)
        }
    }
}

/// Zips `(relative path, bytes)` entries in the given order.
///
/// # Errors
///
/// Returns an error if the archive cannot be written.
pub fn zip_entries(entries: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().unix_permissions(0o644);
    for (name, body) in entries {
        writer
            .start_file(name.as_str(), options)
            .with_context(|| format!("adding {name} to zip"))?;
        writer
            .write_all(body)
            .with_context(|| format!("writing {name} to zip"))?;
    }
    let cursor = writer.finish().context("finishing zip archive")?;
    Ok(cursor.into_inner())
}
