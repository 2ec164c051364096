use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::discovery::FileStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    #[serde(alias = "user_facing")]
    UserFacing,
    Internal,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamplePotential {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

impl Complexity {
    /// Sort rank: simple < moderate < complex.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Simple => 0,
            Self::Moderate => 1,
            Self::Complex => 2,
        }
    }
}

/// Inclusive, one-based line span inside the source file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    pub start: u32,
    pub end: u32,
}

/// One test case extracted from a test file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestBlock {
    pub name: String,
    #[serde(default)]
    pub source_line_range: LineRange,
    #[serde(default)]
    pub features_tested: Vec<String>,
    pub classification: Classification,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_case: Option<String>,
    #[serde(default)]
    pub target_users: Vec<String>,
    pub example_potential: ExamplePotential,
    pub complexity: Complexity,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub key_concepts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_value: Option<String>,
}

impl TestBlock {
    /// Contract check applied to blocks returned by the extraction capability.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("test block has an empty name".to_string());
        }
        let range = self.source_line_range;
        if range.end < range.start {
            return Err(format!(
                "test block '{}' has an inverted line range {}..{}",
                self.name, range.start, range.end
            ));
        }
        Ok(())
    }

    /// Passes the distillation quality filter.
    #[must_use]
    pub fn is_example_candidate(&self) -> bool {
        matches!(
            self.example_potential,
            ExamplePotential::High | ExamplePotential::Medium
        ) && matches!(
            self.classification,
            Classification::UserFacing | Classification::Mixed
        )
    }
}

/// Analysis of a single test file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestFileAnalysis {
    pub source_file: String,
    pub file_status: FileStatus,
    pub blocks: Vec<TestBlock>,
    /// Set when the extraction capability failed for this file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Analysed this run although discovery saw no change, because the
    /// previous analysis was missing or had failed.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub reanalyzed: bool,
}

impl TestFileAnalysis {
    /// Whether this run produced the blocks, so planning must consider them.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.file_status.needs_analysis() || self.reanalyzed
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
}

impl StatusCounts {
    pub fn add(&mut self, status: FileStatus, n: usize) {
        match status {
            FileStatus::Created => self.created += n,
            FileStatus::Updated => self.updated += n,
            FileStatus::Unchanged => self.unchanged += n,
            FileStatus::Deleted => self.deleted += n,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PotentialCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityCounts {
    pub simple: usize,
    pub moderate: usize,
    pub complex: usize,
}

impl ComplexityCounts {
    pub fn add(&mut self, complexity: Complexity) {
        match complexity {
            Complexity::Simple => self.simple += 1,
            Complexity::Moderate => self.moderate += 1,
            Complexity::Complex => self.complex += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionSummary {
    pub total_files: usize,
    pub total_blocks: usize,
    pub files_by_status: StatusCounts,
    pub blocks_by_status: StatusCounts,
    pub by_potential: PotentialCounts,
    pub by_complexity: ComplexityCounts,
    /// Files sent to the extraction capability.
    pub analyzed: usize,
    /// Files whose blocks were copied forward.
    pub reused: usize,
    /// Files whose analysis failed.
    pub failed: usize,
}

impl ExtractionSummary {
    /// Partition counts by file status and block buckets.
    ///
    /// `analyzed` and `reused` are left for the caller to set.
    #[must_use]
    pub fn from_analyses(analyses: &[TestFileAnalysis]) -> Self {
        let mut summary = Self {
            total_files: analyses.len(),
            ..Self::default()
        };
        for analysis in analyses {
            summary.files_by_status.add(analysis.file_status, 1);
            summary
                .blocks_by_status
                .add(analysis.file_status, analysis.blocks.len());
            if analysis.error.is_some() {
                summary.failed += 1;
            }
            for block in &analysis.blocks {
                summary.total_blocks += 1;
                match block.example_potential {
                    ExamplePotential::High => summary.by_potential.high += 1,
                    ExamplePotential::Medium => summary.by_potential.medium += 1,
                    ExamplePotential::Low => summary.by_potential.low += 1,
                }
                summary.by_complexity.add(block.complexity);
            }
        }
        summary
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionDocument {
    #[serde(default = "crate::default_schema_version")]
    pub schema_version: u32,
    pub generated_at: DateTime<Utc>,
    /// One entry per file in the discovery document, same order.
    pub files: Vec<TestFileAnalysis>,
    pub summary: ExtractionSummary,
}

impl ExtractionDocument {
    #[must_use]
    pub fn find(&self, source_file: &str) -> Option<&TestFileAnalysis> {
        self.files.iter().find(|f| f.source_file == source_file)
    }
}
