//! Minimal `{{.Name}}` template rendering for embedded scripts and templates.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use anyhow::{Result, anyhow, bail};
use regex::Regex;

static PLACEHOLDER: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"\{\{\s*\.([A-Za-z_][A-Za-z0-9_]*)\s*\}\}"));

/// Substitutes every `{{.Name}}` with `params[Name]`.
///
/// # Errors
///
/// Returns an error naming every placeholder that has no value.
pub fn render(template: &str, params: &BTreeMap<String, String>) -> Result<String> {
    let re = PLACEHOLDER
        .as_ref()
        .map_err(|e| anyhow!("template pattern: {e}"))?;

    let mut missing: Vec<&str> = re
        .captures_iter(template)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|name| !params.contains_key(*name))
        .collect();
    if !missing.is_empty() {
        missing.sort_unstable();
        missing.dedup();
        bail!("template has no value for: {}", missing.join(", "));
    }

    let rendered = re.replace_all(template, |caps: &regex::Captures<'_>| {
        params.get(&caps[1]).cloned().unwrap_or_default()
    });
    Ok(rendered.into_owned())
}
