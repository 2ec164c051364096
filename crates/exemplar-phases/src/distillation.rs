//! Distillation: select candidate test blocks, plan examples, merge with the
//! previous plan set and assign positional ids.

use chrono::Utc;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use exemplar_model::{
    DistillationDocument, DistillationSummary, ExamplePlan, ExtractionDocument, FileStatus,
    PlanStatus, RunKind, SCHEMA_VERSION, SourceTestRef,
};
use exemplar_utils::PhaseId;
use exemplar_utils::error::PhaseError;
use exemplar_utils::paths::slugify;

use crate::capabilities::{CandidateBlock, ExamplePlanner};

/// Run distillation over `extraction`.
///
/// With a `previous` document the run is incremental: only blocks from
/// created or updated files are offered to the planner, and previous plans
/// are carried forward. A planner failure fails the phase.
pub async fn distill(
    extraction: &ExtractionDocument,
    previous: Option<&DistillationDocument>,
    planner: &dyn ExamplePlanner,
    default_language: &str,
) -> Result<DistillationDocument, PhaseError> {
    let run_kind = if previous.is_some() {
        RunKind::Incremental
    } else {
        RunKind::Full
    };
    let candidates = select_candidates(extraction, run_kind);
    info!(
        run_kind = ?run_kind,
        candidates = candidates.len(),
        "Selected candidate test blocks"
    );

    let fresh = if candidates.is_empty() {
        debug!("No candidate blocks; skipping planner");
        Vec::new()
    } else {
        let planned = planner
            .plan(&candidates)
            .await
            .map_err(|source| PhaseError::CapabilityFailed {
                phase: PhaseId::Distillation,
                source,
            })?;
        let plans = planned
            .into_iter()
            .map(|p| p.into_plan(default_language))
            .collect();
        retain_valid_references(plans, &candidates)
    };

    let deleted_files: HashSet<&str> = extraction
        .files
        .iter()
        .filter(|f| f.file_status == FileStatus::Deleted)
        .map(|f| f.source_file.as_str())
        .collect();

    let mut plans = match previous {
        Some(previous) => merge(fresh, previous, &deleted_files),
        None => fresh,
    };
    assign_ids(&mut plans);

    let summary = DistillationSummary::from_plans(&plans, candidates.len());
    info!(
        total = summary.total_examples,
        planned = summary.planned,
        keep = summary.keep,
        delete = summary.delete,
        "Distillation complete"
    );

    Ok(DistillationDocument {
        schema_version: SCHEMA_VERSION,
        generated_at: Utc::now(),
        run_kind,
        examples: plans,
        summary,
        history: previous.map(|p| p.history.clone()).unwrap_or_default(),
    })
}

/// Blocks that pass the quality filter, from the files this run plans for.
#[must_use]
pub fn select_candidates(extraction: &ExtractionDocument, run_kind: RunKind) -> Vec<CandidateBlock> {
    extraction
        .files
        .iter()
        .filter(|f| match run_kind {
            RunKind::Full => f.file_status != FileStatus::Deleted,
            RunKind::Incremental => f.is_fresh(),
        })
        .flat_map(|f| {
            f.blocks
                .iter()
                .filter(|b| b.is_example_candidate())
                .map(|b| CandidateBlock {
                    source_file: f.source_file.clone(),
                    block: b.clone(),
                })
        })
        .collect()
}

/// Drop source references the planner invented; drop plans left with none.
fn retain_valid_references(plans: Vec<ExamplePlan>, candidates: &[CandidateBlock]) -> Vec<ExamplePlan> {
    let known: HashSet<SourceTestRef> = candidates.iter().map(CandidateBlock::reference).collect();
    plans
        .into_iter()
        .filter_map(|mut plan| {
            let before = plan.source_tests.len();
            plan.source_tests.retain(|t| known.contains(t));
            if plan.source_tests.len() < before {
                warn!(
                    title = %plan.title,
                    dropped = before - plan.source_tests.len(),
                    "Planner referenced unknown tests; dropping those references"
                );
            }
            if plan.source_tests.is_empty() {
                warn!(title = %plan.title, "Dropping plan with no valid source tests");
                return None;
            }
            Some(plan)
        })
        .collect()
}

/// Merge fresh plans with the previous plan set.
///
/// A previous plan is marked `delete` if it cites a deleted file, dropped if
/// a fresh plan supersedes it (same slug or a shared source test), and kept
/// otherwise. Plans already marked `delete` last run are not carried again.
#[must_use]
pub fn merge(
    fresh: Vec<ExamplePlan>,
    previous: &DistillationDocument,
    deleted_files: &HashSet<&str>,
) -> Vec<ExamplePlan> {
    let fresh_slugs: HashSet<String> = fresh.iter().map(|p| slugify(&p.title)).collect();
    let fresh_tests: HashSet<&SourceTestRef> =
        fresh.iter().flat_map(|p| p.source_tests.iter()).collect();

    let mut carried = Vec::new();
    for prior in &previous.examples {
        if prior.status == PlanStatus::Delete {
            continue;
        }
        if prior.source_tests.iter().any(|t| deleted_files.contains(t.file.as_str())) {
            debug!(example_id = %prior.example_id, "Source file deleted; marking plan for removal");
            carried.push(ExamplePlan {
                status: PlanStatus::Delete,
                ..prior.clone()
            });
        } else if fresh_slugs.contains(prior.slug())
            || prior.source_tests.iter().any(|t| fresh_tests.contains(t))
        {
            debug!(example_id = %prior.example_id, "Superseded by a fresh plan");
        } else {
            carried.push(ExamplePlan {
                status: PlanStatus::Keep,
                ..prior.clone()
            });
        }
    }

    let mut merged = fresh;
    merged.extend(carried);
    merged
}

/// Sort by (complexity, title) and number sequentially.
///
/// Ids are `<NN>-<slug>` with at least two digits, widening when there are
/// more than 99 plans. The folder is the id. Content keys are refreshed.
pub fn assign_ids(plans: &mut [ExamplePlan]) {
    for plan in plans.iter_mut() {
        plan.content_key = ExamplePlan::content_key_for(&plan.title, &plan.source_tests)
            .unwrap_or_else(|e| {
                warn!(title = %plan.title, error = %e, "Could not compute content key");
                String::new()
            });
    }
    plans.sort_by(|a, b| {
        a.complexity
            .rank()
            .cmp(&b.complexity.rank())
            .then_with(|| a.title.cmp(&b.title))
            .then_with(|| a.content_key.cmp(&b.content_key))
    });

    let width = plans.len().to_string().len().max(2);
    for (index, plan) in plans.iter_mut().enumerate() {
        plan.example_id = format!("{:0width$}-{}", index + 1, slugify(&plan.title));
        plan.folder = plan.example_id.clone();
    }
}
