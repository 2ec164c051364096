//! Resolution of the package name examples must depend on.

use std::fs;
use std::path::Path;
use tracing::debug;

use exemplar_config::ExampleProfile;

/// The configured package name, else the `name` in the repository's own
/// manifest (`package.json` or `Cargo.toml`, per the profile).
#[must_use]
pub fn resolve_package_name(repo_root: &Path, profile: &ExampleProfile) -> Option<String> {
    if let Some(name) = &profile.package_name {
        return Some(name.clone());
    }

    let manifest = repo_root.join(&profile.manifest_file);
    let content = fs::read_to_string(&manifest).ok()?;
    let name = if profile.manifest_file.ends_with(".toml") {
        let table: toml::Table = toml::from_str(&content).ok()?;
        table
            .get("package")?
            .get("name")?
            .as_str()
            .map(str::to_string)
    } else {
        let value: serde_json::Value = serde_json::from_str(&content).ok()?;
        value.get("name")?.as_str().map(str::to_string)
    };
    debug!(manifest = %manifest.display(), package = ?name, "Resolved package name from repository manifest");
    name
}
