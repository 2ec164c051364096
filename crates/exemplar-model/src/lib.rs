//! Serde data model for every pipeline document.
//!
//! Each phase owns exactly one numbered document. All documents carry
//! `schema_version` and `generated_at`; field and enum names are snake_case
//! on the wire.

use exemplar_utils::PhaseId;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub mod discovery;
pub mod distillation;
pub mod extraction;
pub mod generation;
pub mod quality;
pub mod refinement;

pub use discovery::{DiscoveryDocument, DiscoverySummary, FileStatus, TestFileRecord};
pub use distillation::{
    ArtifactAction, ArtifactPlan, DistillationDocument, DistillationSummary, ExamplePlan,
    PlanStatus, RunKind, SourceTestRef,
};
pub use extraction::{
    Classification, Complexity, ComplexityCounts, ExamplePotential, ExtractionDocument,
    ExtractionSummary, LineRange, PotentialCounts, StatusCounts, TestBlock, TestFileAnalysis,
};
pub use generation::{GeneratedExample, GenerationDocument, GenerationStatus, GenerationSummary};
pub use quality::{
    CheckPassCounts, CheckResult, ExampleQuality, QualityCheck, QualityDocument, QualityIssue,
    QualitySummary, Severity, SeverityCounts,
};
pub use refinement::{RefinementDocument, RefinementFailure, RefinementHistoryEntry};

/// Current on-disk schema version for every document.
pub const SCHEMA_VERSION: u32 = 1;

/// A document owned and written by exactly one phase.
pub trait PhaseDocument: Serialize + DeserializeOwned {
    const PHASE: PhaseId;

    /// Store name, e.g. `01-discovery`.
    fn document_name() -> String {
        Self::PHASE.document_name()
    }
}

impl PhaseDocument for DiscoveryDocument {
    const PHASE: PhaseId = PhaseId::Discovery;
}

impl PhaseDocument for ExtractionDocument {
    const PHASE: PhaseId = PhaseId::Extraction;
}

impl PhaseDocument for DistillationDocument {
    const PHASE: PhaseId = PhaseId::Distillation;
}

impl PhaseDocument for GenerationDocument {
    const PHASE: PhaseId = PhaseId::Generation;
}

impl PhaseDocument for QualityDocument {
    const PHASE: PhaseId = PhaseId::Quality;
}

impl PhaseDocument for RefinementDocument {
    const PHASE: PhaseId = PhaseId::Refinement;
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}
