//! Capability contracts consumed by the phases.
//!
//! Each LLM role is a trait taking typed input and returning a typed,
//! already-validated response. Phases depend only on these traits; the
//! LLM-backed implementations live in [`crate::llm_capabilities`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use exemplar_config::ExampleProfile;
use exemplar_llm::{LlmError, StructuredOutput};
use exemplar_model::{
    ArtifactPlan, Complexity, ExamplePlan, ExamplePotential, PlanStatus, QualityIssue,
    SourceTestRef, TestBlock,
};

/// Decompose one test file into test blocks.
#[async_trait]
pub trait TestBlockExtractor: Send + Sync {
    async fn extract(&self, source_file: &str, content: &str) -> Result<Vec<TestBlock>, LlmError>;
}

/// Turn candidate blocks into example plans, in one call.
#[async_trait]
pub trait ExamplePlanner: Send + Sync {
    async fn plan(&self, candidates: &[CandidateBlock]) -> Result<Vec<PlannedExample>, LlmError>;
}

/// Produce a runnable bundle for one plan.
#[async_trait]
pub trait ExampleGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<ExampleBundle, LlmError>;
}

/// Patch an example's files to address blocking issues.
#[async_trait]
pub trait ExampleRefiner: Send + Sync {
    async fn refine(&self, request: &RefinementRequest) -> Result<RefinementPatch, LlmError>;
}

/// A test block offered to the planner, with its origin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateBlock {
    pub source_file: String,
    pub block: TestBlock,
}

impl CandidateBlock {
    #[must_use]
    pub fn reference(&self) -> SourceTestRef {
        SourceTestRef {
            file: self.source_file.clone(),
            test_name: self.block.name.clone(),
        }
    }
}

/// One plan as returned by the planner, before id assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedExample {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub language: String,
    pub complexity: Complexity,
    pub example_potential: ExamplePotential,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub run_instructions: String,
    #[serde(default)]
    pub expected_output: Vec<String>,
    pub source_tests: Vec<SourceTestRef>,
    #[serde(default)]
    pub artifacts_plan: Vec<ArtifactPlan>,
}

impl PlannedExample {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("planned example has an empty title".to_string());
        }
        if self.source_tests.is_empty() {
            return Err(format!("planned example '{}' has no source tests", self.title));
        }
        Ok(())
    }

    /// A fresh plan with status `planned`; id and folder are assigned later.
    #[must_use]
    pub fn into_plan(self, default_language: &str) -> ExamplePlan {
        let language = if self.language.trim().is_empty() {
            default_language.to_string()
        } else {
            self.language
        };
        ExamplePlan {
            example_id: String::new(),
            title: self.title,
            summary: self.summary,
            language,
            complexity: self.complexity,
            example_potential: self.example_potential,
            folder: String::new(),
            prerequisites: self.prerequisites,
            run_instructions: self.run_instructions,
            expected_output: self.expected_output,
            source_tests: self.source_tests,
            artifacts_plan: self.artifacts_plan,
            status: PlanStatus::Planned,
            content_key: String::new(),
        }
    }
}

/// Source code gathered for one referenced test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSnippet {
    pub file: String,
    pub test_name: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    pub plan: ExamplePlan,
    pub sources: Vec<SourceSnippet>,
    pub profile: ExampleProfile,
    /// Package the example should depend on, when known.
    pub package_name: Option<String>,
}

/// The files of one example, addressed by role rather than name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleSlot {
    Main,
    Readme,
    Manifest,
    Config,
    EnvTemplate,
}

impl BundleSlot {
    pub const ALL: [BundleSlot; 5] = [
        BundleSlot::Main,
        BundleSlot::Readme,
        BundleSlot::Manifest,
        BundleSlot::Config,
        BundleSlot::EnvTemplate,
    ];

    /// File name for this slot under `profile`, or `None` if the profile
    /// has no such file.
    #[must_use]
    pub fn file_name(self, profile: &ExampleProfile) -> Option<&str> {
        match self {
            Self::Main => Some(profile.main_file.as_str()),
            Self::Readme => Some(profile.readme_file.as_str()),
            Self::Manifest => Some(profile.manifest_file.as_str()),
            Self::Config => profile.config_file.as_deref(),
            Self::EnvTemplate => profile.env_template_file.as_deref(),
        }
    }
}

/// Complete output of the generation capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleBundle {
    pub main: String,
    pub readme: String,
    pub manifest: String,
    #[serde(default)]
    pub config: Option<String>,
    #[serde(default)]
    pub env_template: Option<String>,
}

impl ExampleBundle {
    #[must_use]
    pub fn slot(&self, slot: BundleSlot) -> Option<&str> {
        match slot {
            BundleSlot::Main => Some(&self.main),
            BundleSlot::Readme => Some(&self.readme),
            BundleSlot::Manifest => Some(&self.manifest),
            BundleSlot::Config => self.config.as_deref(),
            BundleSlot::EnvTemplate => self.env_template.as_deref(),
        }
    }
}

impl StructuredOutput for ExampleBundle {
    fn validate(&self) -> Result<(), String> {
        for (name, content) in [
            ("main", &self.main),
            ("readme", &self.readme),
            ("manifest", &self.manifest),
        ] {
            if content.trim().is_empty() {
                return Err(format!("bundle field '{name}' is empty"));
            }
        }
        Ok(())
    }
}

/// Current contents of an example directory, `None` for absent files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExampleFiles {
    pub main: Option<String>,
    pub readme: Option<String>,
    pub manifest: Option<String>,
    pub config: Option<String>,
    pub env_template: Option<String>,
}

impl ExampleFiles {
    pub fn set(&mut self, slot: BundleSlot, content: Option<String>) {
        match slot {
            BundleSlot::Main => self.main = content,
            BundleSlot::Readme => self.readme = content,
            BundleSlot::Manifest => self.manifest = content,
            BundleSlot::Config => self.config = content,
            BundleSlot::EnvTemplate => self.env_template = content,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RefinementRequest {
    pub example_id: String,
    /// Critical and high issues only.
    pub issues: Vec<QualityIssue>,
    pub files: ExampleFiles,
    pub profile: ExampleProfile,
}

/// Partial update: `None` leaves the file untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinementPatch {
    #[serde(default)]
    pub main: Option<String>,
    #[serde(default)]
    pub readme: Option<String>,
    #[serde(default)]
    pub manifest: Option<String>,
    #[serde(default)]
    pub config: Option<String>,
    #[serde(default)]
    pub env_template: Option<String>,
}

impl RefinementPatch {
    #[must_use]
    pub fn slot(&self, slot: BundleSlot) -> Option<&str> {
        match slot {
            BundleSlot::Main => self.main.as_deref(),
            BundleSlot::Readme => self.readme.as_deref(),
            BundleSlot::Manifest => self.manifest.as_deref(),
            BundleSlot::Config => self.config.as_deref(),
            BundleSlot::EnvTemplate => self.env_template.as_deref(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        BundleSlot::ALL.iter().all(|s| self.slot(*s).is_none())
    }
}

impl StructuredOutput for RefinementPatch {
    fn validate(&self) -> Result<(), String> {
        match BundleSlot::ALL
            .iter()
            .find(|s| self.slot(**s).is_some_and(|c| c.trim().is_empty()))
        {
            Some(slot) => Err(format!("patch for {slot:?} is present but empty; use null to leave a file untouched")),
            None => Ok(()),
        }
    }
}
