//! The individual quality checks.
//!
//! Each check inspects one example directory and returns the issues it
//! found; an empty list means the check passed.

use regex::Regex;
use std::fs;
use std::path::Path;
use tracing::warn;

use exemplar_config::ExampleProfile;
use exemplar_model::{QualityCheck, QualityIssue, Severity};
use exemplar_runner::ExampleRunner;

use crate::generation::artifacts::ARTIFACTS_DIR;

fn issue(
    check: QualityCheck,
    severity: Severity,
    issue_type: &str,
    description: String,
    recommendation: impl Into<String>,
) -> QualityIssue {
    QualityIssue {
        issue_type: issue_type.to_string(),
        severity,
        description,
        recommendation: recommendation.into(),
        originating_check: check,
    }
}

/// One critical `missing_file` per required file that is absent.
#[must_use]
pub fn completeness(dir: &Path, profile: &ExampleProfile) -> Vec<QualityIssue> {
    profile
        .required_files()
        .into_iter()
        .filter(|name| !dir.join(name).is_file())
        .map(|name| {
            issue(
                QualityCheck::Completeness,
                Severity::Critical,
                "missing_file",
                format!("Required file '{name}' is missing"),
                format!("Add {name} to the example"),
            )
        })
        .collect()
}

/// Manifest dependency and module flag, plus forbidden imports in main.
///
/// A missing manifest or main file is left to [`completeness`].
#[must_use]
pub fn api_usage(dir: &Path, profile: &ExampleProfile, package_name: Option<&str>) -> Vec<QualityIssue> {
    let mut issues = Vec::new();

    if let Ok(manifest) = fs::read_to_string(dir.join(&profile.manifest_file)) {
        issues.extend(manifest_issues(&manifest, profile, package_name));
    }

    if let Ok(main) = fs::read_to_string(dir.join(&profile.main_file)) {
        for forbidden in &profile.forbidden_imports {
            if imports(&main, forbidden) {
                issues.push(issue(
                    QualityCheck::ApiUsage,
                    Severity::Critical,
                    "forbidden_import",
                    format!("{} imports '{forbidden}' directly", profile.main_file),
                    "Use the public package API instead of the internal module",
                ));
            }
        }
    }
    issues
}

fn manifest_issues(manifest: &str, profile: &ExampleProfile, package_name: Option<&str>) -> Vec<QualityIssue> {
    let invalid = |reason: String| {
        vec![issue(
            QualityCheck::ApiUsage,
            Severity::Critical,
            "invalid_manifest",
            format!("{} could not be parsed: {reason}", profile.manifest_file),
            "Write a syntactically valid manifest",
        )]
    };

    if profile.manifest_file.ends_with(".toml") {
        match manifest.parse::<toml::Table>() {
            Ok(table) => toml_manifest_issues(&table, profile, package_name),
            Err(e) => invalid(e.to_string()),
        }
    } else {
        match serde_json::from_str::<serde_json::Value>(manifest) {
            Ok(value) => json_manifest_issues(&value, profile, package_name),
            Err(e) => invalid(e.to_string()),
        }
    }
}

fn json_manifest_issues(
    manifest: &serde_json::Value,
    profile: &ExampleProfile,
    package_name: Option<&str>,
) -> Vec<QualityIssue> {
    let mut issues = Vec::new();

    if let Some(package) = package_name {
        let version = ["dependencies", "devDependencies", "peerDependencies"]
            .iter()
            .find_map(|section| manifest.get(section)?.get(package))
            .map(|v| v.as_str().unwrap_or_default());
        match version {
            None => issues.push(missing_dependency(profile, package)),
            Some(version) if !is_pinned(version, profile) => {
                issues.push(unpinned_dependency(profile, package, version));
            }
            Some(_) => {}
        }
    }

    if let Some(module_type) = &profile.module_type
        && manifest.get("type").and_then(|t| t.as_str()) != Some(module_type.as_str())
    {
        issues.push(issue(
            QualityCheck::ApiUsage,
            Severity::High,
            "missing_module_type",
            format!("{} does not declare \"type\": \"{module_type}\"", profile.manifest_file),
            format!("Add \"type\": \"{module_type}\" to {}", profile.manifest_file),
        ));
    }
    issues
}

fn toml_manifest_issues(
    manifest: &toml::Table,
    profile: &ExampleProfile,
    package_name: Option<&str>,
) -> Vec<QualityIssue> {
    let Some(package) = package_name else {
        return Vec::new();
    };
    let dependency = ["dependencies", "dev-dependencies"]
        .iter()
        .find_map(|section| manifest.get(*section)?.get(package));
    match dependency {
        None => vec![missing_dependency(profile, package)],
        Some(toml::Value::Table(spec))
            if spec.contains_key("path")
                || spec.get("workspace").and_then(toml::Value::as_bool) == Some(true) =>
        {
            Vec::new()
        }
        Some(other) => vec![unpinned_dependency(profile, package, &other.to_string())],
    }
}

fn is_pinned(version: &str, profile: &ExampleProfile) -> bool {
    profile
        .package_reference_prefixes
        .iter()
        .any(|prefix| version.starts_with(prefix.as_str()))
}

fn missing_dependency(profile: &ExampleProfile, package: &str) -> QualityIssue {
    issue(
        QualityCheck::ApiUsage,
        Severity::Critical,
        "missing_dependency",
        format!("{} does not depend on '{package}'", profile.manifest_file),
        format!("Declare '{package}' as a dependency using a local reference"),
    )
}

fn unpinned_dependency(profile: &ExampleProfile, package: &str, version: &str) -> QualityIssue {
    issue(
        QualityCheck::ApiUsage,
        Severity::Critical,
        "unpinned_dependency",
        format!("'{package}' is referenced as '{version}' instead of the local package"),
        format!(
            "Reference '{package}' with one of: {}",
            profile.package_reference_prefixes.join(", ")
        ),
    )
}

/// Whether `code` imports `module` (or a subpath of it).
fn imports(code: &str, module: &str) -> bool {
    let m = regex::escape(module);
    let pattern = format!(
        r#"(?m)(?:\bfrom\s*['"]{m}(?:/[^'"]*)?['"]|\bimport\s*\(?\s*['"]{m}(?:/[^'"]*)?['"]|\brequire\s*\(\s*['"]{m}(?:/[^'"]*)?['"]|^\s*use\s+{m}\b|^\s*from\s+{m}(?:\.\w+)*\s+import\b|^\s*import\s+{m}\b)"#
    );
    match Regex::new(&pattern) {
        Ok(re) => re.is_match(code),
        Err(e) => {
            warn!(module = %module, error = %e, "Could not build import pattern");
            false
        }
    }
}

/// At most one high `test_residue` issue, for the first matching line.
#[must_use]
pub fn language_compliance(dir: &Path, profile: &ExampleProfile) -> Vec<QualityIssue> {
    let Ok(main) = fs::read_to_string(dir.join(&profile.main_file)) else {
        return Vec::new();
    };
    let patterns: Vec<Regex> = profile
        .residue_patterns
        .iter()
        .filter_map(|p| match Regex::new(p) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!(pattern = %p, error = %e, "Ignoring invalid residue pattern");
                None
            }
        })
        .collect();

    for (index, line) in main.lines().enumerate() {
        if patterns.iter().any(|re| re.is_match(line)) {
            return vec![issue(
                QualityCheck::LanguageCompliance,
                Severity::High,
                "test_residue",
                format!(
                    "{} line {} contains test-framework code: {}",
                    profile.main_file,
                    index + 1,
                    line.trim()
                ),
                "Replace assertions, mocks and suite declarations with plain program output",
            )];
        }
    }
    Vec::new()
}

/// A present but empty `artifacts/` directory.
#[must_use]
pub fn artifacts(dir: &Path) -> Vec<QualityIssue> {
    let artifacts = dir.join(ARTIFACTS_DIR);
    if !artifacts.is_dir() {
        return Vec::new();
    }
    let empty = fs::read_dir(&artifacts).is_ok_and(|mut entries| entries.next().is_none());
    if !empty {
        return Vec::new();
    }
    vec![issue(
        QualityCheck::Artifacts,
        Severity::Medium,
        "empty_artifacts",
        format!("{ARTIFACTS_DIR}/ exists but is empty"),
        format!("Add the planned artifacts or remove the {ARTIFACTS_DIR}/ directory"),
    )]
}

/// Run the example; any failure is one critical `runtime_failure`.
pub async fn runability(dir: &Path, runner: &dyn ExampleRunner, execute: bool) -> Vec<QualityIssue> {
    if !execute {
        return Vec::new();
    }
    let outcome = runner.run(dir).await;
    if outcome.success {
        return Vec::new();
    }
    vec![issue(
        QualityCheck::Runability,
        Severity::Critical,
        "runtime_failure",
        format!("Example failed to run: {}", outcome.describe()),
        "Fix the error so the example installs and runs to completion",
    )]
}
