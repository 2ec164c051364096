//! exemplar - turn a codebase's test suite into runnable documentation examples
//!
//! The pipeline reads a repository's tests and produces one small,
//! self-contained example project per user-facing scenario it finds:
//!
//! ```text
//! Discovery → Extraction → Distillation → Generation → Quality ⇄ Refinement
//! ```
//!
//! Each phase writes a numbered JSON document (`01-discovery.json` through
//! `06-refinement.json`) that the next phase reads, so phases can run one
//! at a time from the CLI or all together through [`Pipeline::run_all`].
//!
//! # Quick Start (CLI)
//!
//! ```bash
//! exemplar all --repo . --output .exemplar/out
//! exemplar quality --output .exemplar/out
//! ```
//!
//! # Quick Start (Library)
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use exemplar::{Capabilities, CliArgs, Config, DocumentStore, Pipeline};
//!
//! # async fn demo() -> Result<(), exemplar::ExemplarError> {
//! let config = Config::discover(&CliArgs::default())?;
//! let backend = Arc::from(exemplar_llm::from_config(&config)?);
//! let pipeline = Pipeline::new(DocumentStore::in_dir("out"), config.clone(), ".", "out/examples")
//!     .with_capabilities(Capabilities::from_backend(backend, &config));
//! let report = pipeline.run_all(None).await?;
//! println!("{}", report.quality.trigger_reason);
//! # Ok(())
//! # }
//! ```

pub mod cli;

pub use exemplar_config::{CliArgs, Config, ExampleProfile};
pub use exemplar_model::{
    DiscoveryDocument, DistillationDocument, ExtractionDocument, GenerationDocument,
    QualityDocument, RefinementDocument,
};
pub use exemplar_orchestrator::{Capabilities, Pipeline, PipelineReport, resolve_package_name};
pub use exemplar_phases::{
    ExampleGenerator, ExamplePlanner, ExampleRefiner, TestBlockExtractor, evaluate_trigger,
};
pub use exemplar_runner::{ExampleRunner, ProjectRunner, RunOutcome};
pub use exemplar_store::DocumentStore;
pub use exemplar_utils::{ExemplarError, ExitCode, PhaseId};
