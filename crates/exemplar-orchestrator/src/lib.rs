//! Pipeline orchestration.
//!
//! [`Pipeline`] loads each phase's upstream documents from the document
//! store, runs the phase, and writes its document back. [`Pipeline::run_all`]
//! chains every phase and drives the quality/refinement loop up to the
//! configured iteration budget.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use exemplar_config::{CliArgs, Config};
//! use exemplar_orchestrator::{Capabilities, Pipeline};
//! use exemplar_store::DocumentStore;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::discover(&CliArgs::default())?;
//! let backend = Arc::from(exemplar_llm::from_config(&config)?);
//! let pipeline = Pipeline::new(DocumentStore::in_dir("out"), config.clone(), ".", "out/examples")
//!     .with_capabilities(Capabilities::from_backend(backend, &config));
//! let report = pipeline.run_all(None).await?;
//! println!("{} examples", report.generation.examples.len());
//! # Ok(())
//! # }
//! ```

mod package;
mod pipeline;

pub use package::resolve_package_name;
pub use pipeline::{Capabilities, Pipeline, PipelineReport};
