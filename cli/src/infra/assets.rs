//! Bundled assets: the init script, CloudFormation templates and the
//! synthesized cloud assembly, compiled into the binary.

use anyhow::{Context, Result};
use include_dir::{Dir, DirEntry, include_dir};

use crate::application::ports::AssetSource;

static EMBEDDED_ASSETS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/assets");

/// `AssetSource` over the files embedded at build time.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedAssets;

fn collect_files(dir: &Dir<'static>, out: &mut Vec<String>) {
    for entry in dir.entries() {
        match entry {
            DirEntry::Dir(child) => collect_files(child, out),
            DirEntry::File(file) => out.push(file.path().to_string_lossy().replace('\\', "/")),
        }
    }
}

impl AssetSource for EmbeddedAssets {
    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        EMBEDDED_ASSETS
            .get_file(path)
            .map(|f| f.contents().to_vec())
            .ok_or_else(|| anyhow::anyhow!("embedded asset not found: {path}"))
    }

    fn read_to_string(&self, path: &str) -> Result<String> {
        let bytes = self.read_file(path)?;
        String::from_utf8(bytes).with_context(|| format!("embedded asset {path} is not UTF-8"))
    }

    fn list_files(&self, dir: &str) -> Result<Vec<String>> {
        let root = EMBEDDED_ASSETS
            .get_dir(dir)
            .ok_or_else(|| anyhow::anyhow!("embedded asset directory not found: {dir}"))?;
        let mut files = Vec::new();
        collect_files(root, &mut files);
        files.sort();
        Ok(files)
    }
}
