use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One refinement pass, appended to the distillation document's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinementHistoryEntry {
    pub iteration: u32,
    pub timestamp: DateTime<Utc>,
    /// Examples whose fix call returned without error.
    pub changes_applied: u32,
    /// One human-readable line per fixed issue.
    pub issues_resolved: Vec<String>,
    pub examples_updated: Vec<String>,
    pub issues_before: u32,
    /// Estimate: `issues_before - issues_resolved.len()`. The next quality run is authoritative.
    pub issues_after: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinementFailure {
    pub example_id: String,
    pub reason: String,
}

/// Run-level summary written alongside the history append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementDocument {
    #[serde(default = "crate::default_schema_version")]
    pub schema_version: u32,
    pub generated_at: DateTime<Utc>,
    pub iteration: u32,
    pub entry: RefinementHistoryEntry,
    /// Examples with only medium/low issues.
    pub skipped: Vec<String>,
    pub failed: Vec<RefinementFailure>,
}
