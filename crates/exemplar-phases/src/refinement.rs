//! Refinement: patch examples with critical or high issues and append the
//! outcome to the distillation history.

use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use std::fs;
use tracing::{debug, info, warn};

use exemplar_config::ExampleProfile;
use exemplar_model::{
    DistillationDocument, ExampleQuality, GenerationDocument, QualityDocument, RefinementDocument,
    RefinementFailure, RefinementHistoryEntry, SCHEMA_VERSION,
};
use exemplar_utils::atomic_write::write_file_atomic;

use crate::capabilities::{BundleSlot, ExampleFiles, ExampleRefiner, RefinementRequest};

/// Documents produced by one refinement pass.
#[derive(Debug, Clone)]
pub struct RefinementOutcome {
    /// The run summary, `06-refinement`.
    pub document: RefinementDocument,
    /// The input distillation with the new history entry appended.
    pub distillation: DistillationDocument,
}

/// Attempt to fix every example in `quality` with a blocking issue.
///
/// Examples with only medium or low issues are skipped. A failed fix is
/// recorded and the remaining examples still run.
pub async fn refine(
    quality: &QualityDocument,
    generation: &GenerationDocument,
    distillation: &DistillationDocument,
    examples_dir: &Utf8Path,
    profile: &ExampleProfile,
    refiner: &dyn ExampleRefiner,
    iteration: u32,
) -> RefinementOutcome {
    let mut skipped = Vec::new();
    let mut failed = Vec::new();
    let mut examples_updated = Vec::new();
    let mut issues_resolved = Vec::new();

    for example in &quality.examples {
        if !example.has_blocking_issue() {
            if !example.issues.is_empty() {
                debug!(example_id = %example.example_id, "Only non-blocking issues; skipping");
                skipped.push(example.example_id.clone());
            }
            continue;
        }

        match refine_one(example, generation, examples_dir, profile, refiner).await {
            Ok(()) => {
                info!(example_id = %example.example_id, "Applied refinement");
                examples_updated.push(example.example_id.clone());
                issues_resolved.extend(example.blocking_issues().map(|issue| {
                    format!(
                        "{}: [{}] {}: {}",
                        example.example_id, issue.severity, issue.issue_type, issue.description
                    )
                }));
            }
            Err(reason) => {
                warn!(example_id = %example.example_id, error = %reason, "Refinement failed; continuing");
                failed.push(RefinementFailure {
                    example_id: example.example_id.clone(),
                    reason,
                });
            }
        }
    }

    let issues_before = u32::try_from(quality.summary.issues.total()).unwrap_or(u32::MAX);
    let resolved = u32::try_from(issues_resolved.len()).unwrap_or(u32::MAX);
    let entry = RefinementHistoryEntry {
        iteration,
        timestamp: Utc::now(),
        changes_applied: u32::try_from(examples_updated.len()).unwrap_or(u32::MAX),
        issues_resolved,
        examples_updated,
        issues_before,
        issues_after: issues_before.saturating_sub(resolved),
    };
    info!(
        iteration,
        changes_applied = entry.changes_applied,
        issues_before = entry.issues_before,
        issues_after = entry.issues_after,
        failed = failed.len(),
        "Refinement complete"
    );

    let mut distillation = distillation.clone();
    distillation.history.push(entry.clone());

    RefinementOutcome {
        document: RefinementDocument {
            schema_version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            iteration,
            entry,
            skipped,
            failed,
        },
        distillation,
    }
}

async fn refine_one(
    example: &ExampleQuality,
    generation: &GenerationDocument,
    examples_dir: &Utf8Path,
    profile: &ExampleProfile,
    refiner: &dyn ExampleRefiner,
) -> Result<(), String> {
    let folder = generation
        .find(&example.example_id)
        .map(|g| g.folder.as_str())
        .unwrap_or(example.folder.as_str());
    let dir = locate_dir(examples_dir, folder, &example.example_id)
        .ok_or_else(|| format!("no directory found for {}", example.example_id))?;

    let mut files = ExampleFiles::default();
    for slot in BundleSlot::ALL {
        if let Some(name) = slot.file_name(profile) {
            files.set(slot, fs::read_to_string(dir.join(name)).ok());
        }
    }

    let request = RefinementRequest {
        example_id: example.example_id.clone(),
        issues: example.blocking_issues().cloned().collect(),
        files,
        profile: profile.clone(),
    };
    let patch = refiner.refine(&request).await.map_err(|e| e.to_string())?;

    for slot in BundleSlot::ALL {
        let (Some(content), Some(name)) = (patch.slot(slot), slot.file_name(profile)) else {
            continue;
        };
        write_file_atomic(&dir.join(name), content).map_err(|e| format!("{e:#}"))?;
        debug!(example_id = %example.example_id, file = %name, "Patched file");
    }
    Ok(())
}

/// The example's directory: its recorded folder, else the first directory
/// whose name starts with the example id.
fn locate_dir(examples_dir: &Utf8Path, folder: &str, example_id: &str) -> Option<Utf8PathBuf> {
    let direct = examples_dir.join(folder);
    if !folder.is_empty() && direct.is_dir() {
        return Some(direct);
    }
    let mut matches: Vec<Utf8PathBuf> = examples_dir
        .read_dir_utf8()
        .ok()?
        .flatten()
        .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()) && e.file_name().starts_with(example_id))
        .map(|e| e.path().to_path_buf())
        .collect();
    matches.sort();
    matches.into_iter().next()
}
