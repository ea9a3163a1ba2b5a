//! Package name and base version lookup.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::error::PublishError;
use crate::npm::PackagePublisher;
use crate::types::PackageIdentity;
use crate::version::trim_version;

pub const MANIFEST_FILE: &str = "package.json";

/// Read `package.json` in `dir`.
pub fn read_manifest(dir: &Path) -> Result<PackageIdentity> {
    let path = dir.join(MANIFEST_FILE);
    let content = fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_manifest(&content, &path.display().to_string())
}

/// Parse manifest text; `origin` names it in errors.
pub fn parse_manifest(content: &str, origin: &str) -> Result<PackageIdentity> {
    let invalid = |reason: String| PublishError::Manifest {
        path: origin.to_string(),
        reason,
    };

    let value: Value =
        serde_json::from_str(content).map_err(|e| invalid(format!("not valid JSON: {e}")))?;
    let obj = value
        .as_object()
        .ok_or_else(|| invalid("expected a JSON object".to_string()))?;

    let field = |name: &str| {
        obj.get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or_else(|| invalid(format!("missing string field `{name}`")))
    };

    let name = field("name")?;
    let base_version = trim_version(&field("version")?)?;
    Ok(PackageIdentity { name, base_version })
}

/// Decode `npm pkg get <field>` output.
///
/// A single package prints a JSON string (`"1.6.0"`); a workspace selection
/// prints an object keyed by workspace name, of which the first entry is used.
pub fn parse_pkg_get(raw: &str, field: &str) -> Result<String> {
    let invalid = |reason: String| PublishError::Manifest {
        path: format!("npm pkg get {field}"),
        reason,
    };

    let value: Value = serde_json::from_str(raw.trim())
        .map_err(|e| invalid(format!("unexpected output {raw:?}: {e}")))?;

    let found = match &value {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => map.values().next().and_then(Value::as_str),
        _ => None,
    };

    found
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| invalid(format!("no `{field}` in output {raw:?}")).into())
}

/// Resolve the package to publish.
///
/// Without a workspace selector the manifest is read directly; with one, npm
/// resolves the selector (a name or a path) for us.
pub fn load_identity(
    dir: &Path,
    workspace: Option<&str>,
    publisher: &mut dyn PackagePublisher,
) -> Result<PackageIdentity> {
    if workspace.is_none() {
        return read_manifest(dir);
    }

    let version = parse_pkg_get(&publisher.package_field("version")?, "version")?;
    let name = parse_pkg_get(&publisher.package_field("name")?, "name")?;
    Ok(PackageIdentity {
        name,
        base_version: trim_version(&version)?,
    })
}
