//! The six pipeline phases.
//!
//! Every phase is a function of its upstream documents, its own previous
//! document (when it has one) and the capabilities it needs. None of them
//! touch the document store; loading and saving is the orchestrator's job.

pub mod capabilities;
pub mod discovery;
pub mod distillation;
pub mod extraction;
pub mod generation;
pub mod llm_capabilities;
mod prompts;
pub mod quality;
pub mod refinement;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use capabilities::{
    BundleSlot, CandidateBlock, ExampleBundle, ExampleFiles, ExampleGenerator, ExamplePlanner,
    ExampleRefiner, GenerationRequest, PlannedExample, RefinementPatch, RefinementRequest,
    SourceSnippet, TestBlockExtractor,
};
pub use discovery::{TestFileMatcher, discover};
pub use distillation::distill;
pub use extraction::extract;
pub use generation::generate;
pub use llm_capabilities::LlmCapabilities;
pub use quality::{QualityOptions, assess, evaluate_trigger};
pub use refinement::{RefinementOutcome, refine};
