use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::extraction::{Complexity, ComplexityCounts, ExamplePotential};
use crate::refinement::RefinementHistoryEntry;
use exemplar_utils::fingerprint::canonical_fingerprint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// Freshly planned this run.
    Planned,
    /// Carried over unchanged from the previous run.
    Keep,
    /// Carried over because a source file was deleted; downstream must retract it.
    Delete,
}

impl PlanStatus {
    /// Planned and kept examples are materialized; deleted ones are not.
    #[must_use]
    pub const fn is_materialized(self) -> bool {
        matches!(self, Self::Planned | Self::Keep)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    /// No usable previous distillation document.
    Full,
    /// Merged against the previous distillation document.
    Incremental,
}

/// Back-reference to the test block a plan was built from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceTestRef {
    pub file: String,
    pub test_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactAction {
    /// Copy `source_path` from the repository verbatim.
    Copy,
    /// Synthesize a minimal placeholder for the declared type.
    Generate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPlan {
    /// Destination path relative to the example's `artifacts/` directory.
    pub path: String,
    #[serde(rename = "type")]
    pub artifact_type: String,
    pub action: ArtifactAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamplePlan {
    /// `<NN>-<slug>`; positional, recomputed every distillation run.
    pub example_id: String,
    pub title: String,
    pub summary: String,
    pub language: String,
    pub complexity: Complexity,
    pub example_potential: ExamplePotential,
    pub folder: String,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub run_instructions: String,
    #[serde(default)]
    pub expected_output: Vec<String>,
    pub source_tests: Vec<SourceTestRef>,
    #[serde(default)]
    pub artifacts_plan: Vec<ArtifactPlan>,
    pub status: PlanStatus,
    /// Stable content identity: BLAKE3 over canonical (title, sorted source tests).
    #[serde(default)]
    pub content_key: String,
}

impl ExamplePlan {
    /// Compute the content identity for a title and its source tests.
    ///
    /// Source test order does not affect the key.
    pub fn content_key_for(title: &str, source_tests: &[SourceTestRef]) -> anyhow::Result<String> {
        let mut sorted = source_tests.to_vec();
        sorted.sort();
        sorted.dedup();
        canonical_fingerprint(&(title, sorted))
    }

    /// Whether any source test points at `file`.
    #[must_use]
    pub fn references_file(&self, file: &str) -> bool {
        self.source_tests.iter().any(|t| t.file == file)
    }

    /// The slug part of `example_id` (everything after the numeric prefix).
    #[must_use]
    pub fn slug(&self) -> &str {
        match self.example_id.split_once('-') {
            Some((prefix, rest)) if prefix.chars().all(|c| c.is_ascii_digit()) => rest,
            _ => &self.example_id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistillationSummary {
    pub total_examples: usize,
    pub planned: usize,
    pub keep: usize,
    pub delete: usize,
    /// Blocks that passed the filter and were offered to the planner.
    pub candidate_blocks: usize,
    pub by_complexity: ComplexityCounts,
}

impl DistillationSummary {
    #[must_use]
    pub fn from_plans(plans: &[ExamplePlan], candidate_blocks: usize) -> Self {
        let mut summary = Self {
            total_examples: plans.len(),
            candidate_blocks,
            ..Self::default()
        };
        for plan in plans {
            match plan.status {
                PlanStatus::Planned => summary.planned += 1,
                PlanStatus::Keep => summary.keep += 1,
                PlanStatus::Delete => summary.delete += 1,
            }
            summary.by_complexity.add(plan.complexity);
        }
        summary
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistillationDocument {
    #[serde(default = "crate::default_schema_version")]
    pub schema_version: u32,
    pub generated_at: DateTime<Utc>,
    pub run_kind: RunKind,
    /// Sorted by `example_id`.
    pub examples: Vec<ExamplePlan>,
    pub summary: DistillationSummary,
    /// Append-only refinement audit log, carried across distillation runs.
    #[serde(default)]
    pub history: Vec<RefinementHistoryEntry>,
}

impl DistillationDocument {
    #[must_use]
    pub fn find(&self, example_id: &str) -> Option<&ExamplePlan> {
        self.examples.iter().find(|e| e.example_id == example_id)
    }

    /// Look up a plan by content identity instead of positional id.
    #[must_use]
    pub fn find_by_content_key(&self, key: &str) -> Option<&ExamplePlan> {
        self.examples.iter().find(|e| e.content_key == key)
    }

    pub fn materialized(&self) -> impl Iterator<Item = &ExamplePlan> {
        self.examples.iter().filter(|e| e.status.is_materialized())
    }
}
