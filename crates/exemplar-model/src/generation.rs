use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    Generated,
    /// Reserved for soft failures; no current check produces it.
    NeedsReview,
    Error,
}

impl GenerationStatus {
    /// Statuses the quality battery validates.
    #[must_use]
    pub const fn is_validatable(self) -> bool {
        matches!(self, Self::Generated | Self::NeedsReview)
    }
}

/// Manifest of one materialized example directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedExample {
    pub example_id: String,
    /// Directory name under the examples root.
    pub folder: String,
    pub status: GenerationStatus,
    /// Paths relative to the example folder.
    pub generated_files: Vec<String>,
    pub generated_artifacts: Vec<String>,
    #[serde(default)]
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub total: usize,
    pub generated: usize,
    pub needs_review: usize,
    pub error: usize,
    /// Stale example directories removed this run.
    pub pruned: usize,
}

impl GenerationSummary {
    #[must_use]
    pub fn from_examples(examples: &[GeneratedExample], pruned: usize) -> Self {
        let mut summary = Self {
            total: examples.len(),
            pruned,
            ..Self::default()
        };
        for example in examples {
            match example.status {
                GenerationStatus::Generated => summary.generated += 1,
                GenerationStatus::NeedsReview => summary.needs_review += 1,
                GenerationStatus::Error => summary.error += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationDocument {
    #[serde(default = "crate::default_schema_version")]
    pub schema_version: u32,
    pub generated_at: DateTime<Utc>,
    pub examples_dir: String,
    pub examples: Vec<GeneratedExample>,
    pub summary: GenerationSummary,
}

impl GenerationDocument {
    #[must_use]
    pub fn find(&self, example_id: &str) -> Option<&GeneratedExample> {
        self.examples.iter().find(|e| e.example_id == example_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needs_review_is_validated_but_error_is_not() {
        assert!(GenerationStatus::Generated.is_validatable());
        assert!(GenerationStatus::NeedsReview.is_validatable());
        assert!(!GenerationStatus::Error.is_validatable());
    }

    #[test]
    fn needs_review_wire_name() {
        assert_eq!(
            serde_json::to_string(&GenerationStatus::NeedsReview).unwrap(),
            "\"needs_review\""
        );
    }
}
