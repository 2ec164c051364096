//! Generation: materialize one directory per planned or kept example.

pub mod artifacts;
pub mod snippet;

use camino::Utf8Path;
use chrono::Utc;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use exemplar_config::ExampleProfile;
use exemplar_model::{
    DistillationDocument, ExamplePlan, GeneratedExample, GenerationDocument, GenerationStatus,
    GenerationSummary, SCHEMA_VERSION,
};
use exemplar_utils::PhaseId;
use exemplar_utils::atomic_write::write_file_atomic;
use exemplar_utils::error::PhaseError;
use exemplar_utils::paths::ensure_dir_all;

use crate::capabilities::{BundleSlot, ExampleBundle, ExampleGenerator, GenerationRequest, SourceSnippet};
use snippet::Located;

/// Directory names that look like an example id.
static EXAMPLE_DIR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+-").unwrap());

/// Run generation for every materialized plan in `distillation`.
///
/// Examples are generated one at a time. A failure for one example is
/// recorded as `error` with the message in its notes. Directories under
/// `examples_dir` that look like examples but belong to no current plan
/// are removed afterwards.
pub async fn generate(
    distillation: &DistillationDocument,
    repo_root: &Path,
    examples_dir: &Utf8Path,
    profile: &ExampleProfile,
    package_name: Option<&str>,
    generator: &dyn ExampleGenerator,
) -> Result<GenerationDocument, PhaseError> {
    ensure_dir_all(examples_dir).map_err(|e| PhaseError::Filesystem {
        phase: PhaseId::Generation,
        path: examples_dir.to_string(),
        reason: e.to_string(),
    })?;

    let mut examples = Vec::new();
    for plan in distillation.materialized() {
        let example = generate_one(plan, repo_root, examples_dir, profile, package_name, generator).await;
        examples.push(example);
    }

    let live: HashSet<&str> = distillation.materialized().map(|p| p.folder.as_str()).collect();
    let pruned = prune_stale(examples_dir, &live);

    let summary = GenerationSummary::from_examples(&examples, pruned);
    info!(
        total = summary.total,
        generated = summary.generated,
        errors = summary.error,
        pruned,
        "Generation complete"
    );

    Ok(GenerationDocument {
        schema_version: SCHEMA_VERSION,
        generated_at: Utc::now(),
        examples_dir: examples_dir.to_string(),
        examples,
        summary,
    })
}

async fn generate_one(
    plan: &ExamplePlan,
    repo_root: &Path,
    examples_dir: &Utf8Path,
    profile: &ExampleProfile,
    package_name: Option<&str>,
    generator: &dyn ExampleGenerator,
) -> GeneratedExample {
    let mut notes = Vec::new();
    let sources = gather_sources(repo_root, plan, &mut notes);
    let request = GenerationRequest {
        plan: plan.clone(),
        sources,
        profile: profile.clone(),
        package_name: package_name.map(str::to_string),
    };

    let bundle = match generator.generate(&request).await {
        Ok(bundle) => bundle,
        Err(e) => return failed(plan, notes, e.to_string()),
    };

    let dir = examples_dir.join(&plan.folder);
    let generated_files = match materialize(&dir, &bundle, profile) {
        Ok(files) => files,
        Err(e) => return failed(plan, notes, format!("{e:#}")),
    };
    let generated_artifacts = artifacts::resolve(repo_root, &dir, &plan.artifacts_plan, &mut notes);

    debug!(
        example_id = %plan.example_id,
        files = generated_files.len(),
        artifacts = generated_artifacts.len(),
        "Generated example"
    );
    GeneratedExample {
        example_id: plan.example_id.clone(),
        folder: plan.folder.clone(),
        status: GenerationStatus::Generated,
        generated_files,
        generated_artifacts,
        notes,
    }
}

fn failed(plan: &ExamplePlan, mut notes: Vec<String>, error: String) -> GeneratedExample {
    warn!(example_id = %plan.example_id, error = %error, "Generation failed; continuing");
    notes.push(error);
    GeneratedExample {
        example_id: plan.example_id.clone(),
        folder: plan.folder.clone(),
        status: GenerationStatus::Error,
        generated_files: Vec::new(),
        generated_artifacts: Vec::new(),
        notes,
    }
}

/// Replace `dir` with the bundle's files; returns the file names written.
fn materialize(dir: &Utf8Path, bundle: &ExampleBundle, profile: &ExampleProfile) -> anyhow::Result<Vec<String>> {
    use anyhow::Context;

    if dir.exists() {
        fs::remove_dir_all(dir).with_context(|| format!("Failed to clear example directory: {dir}"))?;
    }
    ensure_dir_all(dir).with_context(|| format!("Failed to create example directory: {dir}"))?;

    let mut written = Vec::new();
    for slot in BundleSlot::ALL {
        let (Some(name), Some(content)) = (slot.file_name(profile), bundle.slot(slot)) else {
            continue;
        };
        write_file_atomic(&dir.join(name), content)?;
        written.push(name.to_string());
    }
    Ok(written)
}

/// Source code for every test the plan references, grouped by file.
fn gather_sources(repo_root: &Path, plan: &ExamplePlan, notes: &mut Vec<String>) -> Vec<SourceSnippet> {
    let mut by_file: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for test in &plan.source_tests {
        by_file.entry(test.file.as_str()).or_default().push(test.test_name.as_str());
    }

    let mut snippets = Vec::new();
    for (file, names) in by_file {
        let content = match fs::read_to_string(repo_root.join(file)) {
            Ok(content) => content,
            Err(e) => {
                warn!(file = %file, error = %e, "Could not read source test file");
                notes.push(format!("source file '{file}' could not be read: {e}"));
                continue;
            }
        };
        for name in names {
            let code = match snippet::locate(&content, name) {
                Located::Found(code) => code,
                Located::Ambiguous { code, matches } => {
                    notes.push(format!(
                        "test '{name}' in {file} matched {matches} declarations; used the first"
                    ));
                    code
                }
                Located::NotFound => {
                    notes.push(format!(
                        "test '{name}' not located in {file}; supplied the whole file"
                    ));
                    content.clone()
                }
            };
            snippets.push(SourceSnippet {
                file: file.to_string(),
                test_name: name.to_string(),
                code,
            });
        }
    }
    snippets
}

/// Remove example-looking directories not in `live`. Returns how many went.
fn prune_stale(examples_dir: &Utf8Path, live: &HashSet<&str>) -> usize {
    let Ok(entries) = fs::read_dir(examples_dir) else {
        return 0;
    };
    let mut pruned = 0;
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());
        if !is_dir || !EXAMPLE_DIR.is_match(&name) || live.contains(name.as_str()) {
            continue;
        }
        match fs::remove_dir_all(entry.path()) {
            Ok(()) => {
                debug!(folder = %name, "Pruned stale example directory");
                pruned += 1;
            }
            Err(e) => warn!(folder = %name, error = %e, "Failed to prune stale example directory"),
        }
    }
    pruned
}
