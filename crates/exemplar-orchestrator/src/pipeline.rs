//! Document-backed execution of the phases.

use camino::Utf8PathBuf;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, info};

use exemplar_config::Config;
use exemplar_llm::{LlmBackend, LlmError};
use exemplar_model::{
    DiscoveryDocument, DistillationDocument, ExtractionDocument, GenerationDocument,
    QualityDocument, RefinementDocument,
};
use exemplar_phases::{
    ExampleGenerator, ExamplePlanner, ExampleRefiner, LlmCapabilities, QualityOptions,
    TestBlockExtractor,
};
use exemplar_runner::{ExampleRunner, ProjectRunner};
use exemplar_store::DocumentStore;
use exemplar_utils::PhaseId;
use exemplar_utils::error::ExemplarError;
use exemplar_utils::logging::{log_phase_complete, log_phase_error, log_phase_start, phase_span};

use crate::package::resolve_package_name;

/// The four LLM roles the pipeline needs.
#[derive(Clone)]
pub struct Capabilities {
    pub extractor: Arc<dyn TestBlockExtractor>,
    pub planner: Arc<dyn ExamplePlanner>,
    pub generator: Arc<dyn ExampleGenerator>,
    pub refiner: Arc<dyn ExampleRefiner>,
}

impl Capabilities {
    /// All roles served by one backend.
    #[must_use]
    pub fn from_backend(backend: Arc<dyn LlmBackend>, config: &Config) -> Self {
        let llm = Arc::new(LlmCapabilities::new(backend, config));
        Self {
            extractor: llm.clone(),
            planner: llm.clone(),
            generator: llm.clone(),
            refiner: llm,
        }
    }
}

/// Result of [`Pipeline::run_all`].
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub discovery: DiscoveryDocument,
    pub extraction: ExtractionDocument,
    pub distillation: DistillationDocument,
    pub generation: GenerationDocument,
    /// The last quality assessment.
    pub quality: QualityDocument,
    pub refinements: Vec<RefinementDocument>,
}

/// Runs phases against a [`DocumentStore`].
///
/// Single-phase methods read their upstream documents from the store's
/// input directory and write to its output directory. [`run_all`] hands
/// documents from one phase to the next directly.
///
/// [`run_all`]: Pipeline::run_all
pub struct Pipeline {
    store: DocumentStore,
    config: Config,
    repo_root: PathBuf,
    examples_dir: Utf8PathBuf,
    capabilities: Option<Capabilities>,
    runner: Arc<dyn ExampleRunner>,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        store: DocumentStore,
        config: Config,
        repo_root: impl Into<PathBuf>,
        examples_dir: impl Into<Utf8PathBuf>,
    ) -> Self {
        let runner = Arc::new(ProjectRunner::from_config(&config));
        Self {
            store,
            config,
            repo_root: repo_root.into(),
            examples_dir: examples_dir.into(),
            capabilities: None,
            runner,
        }
    }

    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn ExampleRunner>) -> Self {
        self.runner = runner;
        self
    }

    #[must_use]
    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn capabilities(&self) -> Result<&Capabilities, ExemplarError> {
        self.capabilities.as_ref().ok_or_else(|| {
            LlmError::Misconfiguration("no LLM backend configured for this pipeline".to_string())
                .into()
        })
    }

    pub async fn run_discovery(&self, limit: Option<usize>) -> Result<DiscoveryDocument, ExemplarError> {
        timed(PhaseId::Discovery, async {
            let previous = self.store.read_previous::<DiscoveryDocument>();
            let document = exemplar_phases::discover(
                &self.repo_root,
                &self.config.discovery,
                limit,
                previous.as_ref(),
            )?;
            self.store.write(&document)?;
            Ok::<_, ExemplarError>(document)
        })
        .await
    }

    pub async fn run_extraction(&self) -> Result<ExtractionDocument, ExemplarError> {
        let discovery = self.store.read_required::<DiscoveryDocument>(PhaseId::Extraction)?;
        self.extraction(&discovery).await
    }

    async fn extraction(&self, discovery: &DiscoveryDocument) -> Result<ExtractionDocument, ExemplarError> {
        timed(PhaseId::Extraction, async {
            let extractor = self.capabilities()?.extractor.clone();
            let previous = self.store.read_previous::<ExtractionDocument>();
            let document = exemplar_phases::extract(
                &self.repo_root,
                discovery,
                previous.as_ref(),
                extractor.as_ref(),
                self.config.batch_size(),
            )
            .await;
            self.store.write(&document)?;
            Ok::<_, ExemplarError>(document)
        })
        .await
    }

    pub async fn run_distillation(&self) -> Result<DistillationDocument, ExemplarError> {
        let extraction = self.store.read_required::<ExtractionDocument>(PhaseId::Distillation)?;
        self.distillation(&extraction).await
    }

    async fn distillation(&self, extraction: &ExtractionDocument) -> Result<DistillationDocument, ExemplarError> {
        timed(PhaseId::Distillation, async {
            let planner = self.capabilities()?.planner.clone();
            let previous = self.store.read_previous::<DistillationDocument>();
            let document = exemplar_phases::distill(
                extraction,
                previous.as_ref(),
                planner.as_ref(),
                &self.config.example.language,
            )
            .await?;
            self.store.write(&document)?;
            Ok::<_, ExemplarError>(document)
        })
        .await
    }

    pub async fn run_generation(&self) -> Result<GenerationDocument, ExemplarError> {
        let distillation = self.store.read_required::<DistillationDocument>(PhaseId::Generation)?;
        self.generation(&distillation).await
    }

    async fn generation(&self, distillation: &DistillationDocument) -> Result<GenerationDocument, ExemplarError> {
        timed(PhaseId::Generation, async {
            let generator = self.capabilities()?.generator.clone();
            let package = resolve_package_name(&self.repo_root, &self.config.example);
            let document = exemplar_phases::generate(
                distillation,
                &self.repo_root,
                &self.examples_dir,
                &self.config.example,
                package.as_deref(),
                generator.as_ref(),
            )
            .await?;
            self.store.write(&document)?;
            Ok::<_, ExemplarError>(document)
        })
        .await
    }

    pub async fn run_quality(&self, iteration: u32) -> Result<QualityDocument, ExemplarError> {
        let generation = self.store.read_required::<GenerationDocument>(PhaseId::Quality)?;
        self.quality(&generation, iteration).await
    }

    async fn quality(&self, generation: &GenerationDocument, iteration: u32) -> Result<QualityDocument, ExemplarError> {
        timed(PhaseId::Quality, async {
            let package = resolve_package_name(&self.repo_root, &self.config.example);
            let options = QualityOptions {
                iteration,
                execute: self.config.quality.execute,
                failure_threshold: self.config.quality.failure_threshold,
            };
            let document = exemplar_phases::assess(
                generation,
                &self.examples_dir,
                &self.config.example,
                package.as_deref(),
                options,
                self.runner.as_ref(),
            )
            .await;
            self.store.write(&document)?;
            Ok::<_, ExemplarError>(document)
        })
        .await
    }

    /// Refine using the stored quality, generation and distillation
    /// documents. `iteration` defaults to one past the quality iteration.
    pub async fn run_refinement(&self, iteration: Option<u32>) -> Result<RefinementDocument, ExemplarError> {
        let quality = self.store.read_required::<QualityDocument>(PhaseId::Refinement)?;
        let generation = self.store.read_required::<GenerationDocument>(PhaseId::Refinement)?;
        let distillation = self.store.read_required::<DistillationDocument>(PhaseId::Refinement)?;
        let iteration = iteration.unwrap_or(quality.iteration + 1);
        let (document, _) = self
            .refinement(&quality, &generation, &distillation, iteration)
            .await?;
        Ok(document)
    }

    async fn refinement(
        &self,
        quality: &QualityDocument,
        generation: &GenerationDocument,
        distillation: &DistillationDocument,
        iteration: u32,
    ) -> Result<(RefinementDocument, DistillationDocument), ExemplarError> {
        timed(PhaseId::Refinement, async {
            let refiner = self.capabilities()?.refiner.clone();
            let outcome = exemplar_phases::refine(
                quality,
                generation,
                distillation,
                &self.examples_dir,
                &self.config.example,
                refiner.as_ref(),
                iteration,
            )
            .await;
            self.store.write(&outcome.distillation)?;
            self.store.write(&outcome.document)?;
            Ok::<_, ExemplarError>((outcome.document, outcome.distillation))
        })
        .await
    }

    /// Every phase in order, then quality and refinement alternating until
    /// quality stops triggering or `max_iterations` refinements have run.
    pub async fn run_all(&self, limit: Option<usize>) -> Result<PipelineReport, ExemplarError> {
        let discovery = self.run_discovery(limit).await?;
        let extraction = self.extraction(&discovery).await?;
        let mut distillation = self.distillation(&extraction).await?;
        let generation = self.generation(&distillation).await?;
        let mut quality = self.quality(&generation, 0).await?;

        let max_iterations = self.config.max_iterations();
        let mut refinements = Vec::new();
        let mut iteration = 0;
        while quality.should_trigger_refinement && iteration < max_iterations {
            iteration += 1;
            info!(iteration, reason = %quality.trigger_reason, "Quality triggered refinement");
            let (document, updated) = self
                .refinement(&quality, &generation, &distillation, iteration)
                .await?;
            distillation = updated;
            refinements.push(document);
            quality = self.quality(&generation, iteration).await?;
        }
        if quality.should_trigger_refinement {
            info!(
                iterations = iteration,
                reason = %quality.trigger_reason,
                "Refinement budget exhausted with issues remaining"
            );
        }

        Ok(PipelineReport {
            discovery,
            extraction,
            distillation,
            generation,
            quality,
            refinements,
        })
    }
}

/// Run `work` inside the phase span with start/finish logging.
async fn timed<T, F>(phase: PhaseId, work: F) -> Result<T, ExemplarError>
where
    F: Future<Output = Result<T, ExemplarError>>,
{
    async move {
        log_phase_start(phase);
        let start = Instant::now();
        let result = work.await;
        let elapsed = start.elapsed().as_millis();
        match &result {
            Ok(_) => log_phase_complete(phase, elapsed),
            Err(e) => log_phase_error(phase, &e.to_string(), elapsed),
        }
        result
    }
    .instrument(phase_span(phase))
    .await
}
