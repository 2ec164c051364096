//! Command implementations.
//!
//! Each `execute_*` function runs one phase through a [`Pipeline`] and
//! prints a short summary to stdout. Errors are returned to `run()`, which
//! owns all error output.

use anyhow::{Context, Result, anyhow};
use camino::Utf8PathBuf;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::{Capabilities, Config, DocumentStore, Pipeline};
use exemplar_model::{
    DiscoveryDocument, DistillationDocument, ExtractionDocument, GenerationDocument,
    QualityDocument, RefinementDocument,
};

use super::args::{DocumentArgs, ExamplesArgs};

/// Where a command reads from and writes to.
#[derive(Debug, Clone)]
pub struct Locations {
    pub repo: PathBuf,
    pub input: Utf8PathBuf,
    pub output: Utf8PathBuf,
    pub examples_dir: Utf8PathBuf,
}

impl Locations {
    pub fn resolve(repo: &Path, docs: &DocumentArgs, examples: Option<&ExamplesArgs>) -> Result<Self> {
        let output = utf8(&docs.output)?;
        let input = match &docs.input {
            Some(input) => utf8(input)?,
            None => output.clone(),
        };
        let examples_dir = match examples.and_then(|e| e.examples_dir.as_ref()) {
            Some(dir) => utf8(dir)?,
            None => output.join("examples"),
        };
        Ok(Self {
            repo: repo.to_path_buf(),
            input,
            output,
            examples_dir,
        })
    }

    pub fn pipeline(&self, config: &Config, capabilities: Option<Capabilities>) -> Pipeline {
        let store = DocumentStore::new(self.input.clone(), self.output.clone());
        let pipeline = Pipeline::new(store, config.clone(), &self.repo, self.examples_dir.clone());
        match capabilities {
            Some(capabilities) => pipeline.with_capabilities(capabilities),
            None => pipeline,
        }
    }
}

fn utf8(path: &Path) -> Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path.to_path_buf())
        .map_err(|p| anyhow!("path is not valid UTF-8: {}", p.display()))
}

/// Capabilities backed by the configured LLM provider.
pub fn llm_capabilities(config: &Config) -> Result<Capabilities> {
    let backend = exemplar_llm::from_config(config)
        .map_err(crate::ExemplarError::from)
        .context("failed to construct LLM backend")?;
    Ok(Capabilities::from_backend(Arc::from(backend), config))
}

pub async fn execute_discover_command(pipeline: &Pipeline, limit: Option<usize>) -> Result<()> {
    let document = pipeline.run_discovery(limit).await?;
    print_discovery(&document);
    Ok(())
}

pub async fn execute_extract_command(pipeline: &Pipeline) -> Result<()> {
    let document = pipeline.run_extraction().await?;
    print_extraction(&document);
    Ok(())
}

pub async fn execute_distill_command(pipeline: &Pipeline) -> Result<()> {
    let document = pipeline.run_distillation().await?;
    print_distillation(&document);
    Ok(())
}

pub async fn execute_generate_command(pipeline: &Pipeline) -> Result<()> {
    let document = pipeline.run_generation().await?;
    print_generation(&document);
    Ok(())
}

pub async fn execute_quality_command(pipeline: &Pipeline, iteration: u32) -> Result<()> {
    let document = pipeline.run_quality(iteration).await?;
    print_quality(&document);
    Ok(())
}

pub async fn execute_refine_command(pipeline: &Pipeline, iteration: Option<u32>) -> Result<()> {
    let document = pipeline.run_refinement(iteration).await?;
    print_refinement(&document);
    Ok(())
}

pub async fn execute_all_command(pipeline: &Pipeline, limit: Option<usize>) -> Result<()> {
    let report = pipeline.run_all(limit).await?;
    print_discovery(&report.discovery);
    print_extraction(&report.extraction);
    print_distillation(&report.distillation);
    print_generation(&report.generation);
    for refinement in &report.refinements {
        print_refinement(refinement);
    }
    print_quality(&report.quality);
    println!(
        "\nDocuments written to {}, examples to {}",
        pipeline.store().output_dir(),
        report.generation.examples_dir
    );
    Ok(())
}

fn print_discovery(document: &DiscoveryDocument) {
    let s = &document.summary;
    println!("✓ Discovery: {} test files", s.total_discovered);
    println!(
        "  created {}, updated {}, unchanged {}, deleted {}",
        s.created, s.updated, s.unchanged, s.deleted
    );
}

fn print_extraction(document: &ExtractionDocument) {
    let s = &document.summary;
    println!("✓ Extraction: {} test blocks from {} files", s.total_blocks, s.total_files);
    println!("  analyzed {}, reused {}, failed {}", s.analyzed, s.reused, s.failed);
    for file in &document.files {
        if let Some(error) = &file.error {
            println!("  ⚠ {}: {error}", file.source_file);
        }
    }
}

fn print_distillation(document: &DistillationDocument) {
    let s = &document.summary;
    println!(
        "✓ Distillation: {} examples from {} candidate blocks",
        s.total_examples, s.candidate_blocks
    );
    println!("  planned {}, keep {}, delete {}", s.planned, s.keep, s.delete);
}

fn print_generation(document: &GenerationDocument) {
    let s = &document.summary;
    println!("✓ Generation: {} of {} examples generated", s.generated, s.total);
    if s.error > 0 {
        println!("  {} failed", s.error);
    }
    if s.pruned > 0 {
        println!("  pruned {} stale directories", s.pruned);
    }
}

fn print_quality(document: &QualityDocument) {
    let s = &document.summary;
    println!(
        "✓ Quality (iteration {}): {} passed, {} failed of {} validated",
        document.iteration, s.passed, s.failed, s.validated
    );
    println!(
        "  issues: {} critical, {} high, {} medium, {} low",
        s.issues.critical, s.issues.high, s.issues.medium, s.issues.low
    );
    if document.should_trigger_refinement {
        println!("  refinement needed: {}", document.trigger_reason);
        for line in &document.recommendations {
            println!("    - {line}");
        }
    } else {
        println!("  {}", document.trigger_reason);
    }
}

fn print_refinement(document: &RefinementDocument) {
    let entry = &document.entry;
    println!(
        "✓ Refinement (iteration {}): {} examples updated, {} issues addressed",
        document.iteration,
        entry.examples_updated.len(),
        entry.issues_resolved.len()
    );
    println!("  issues before {}, estimated after {}", entry.issues_before, entry.issues_after);
    for failure in &document.failed {
        println!("  ⚠ {}: {}", failure.example_id, failure.reason);
    }
}
