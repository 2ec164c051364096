//! Capability implementations backed by an [`LlmBackend`].

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use exemplar_config::{Config, ExampleProfile};
use exemplar_llm::{LlmBackend, LlmError, LlmInvocation, Message, StructuredOutput, invoke_structured};
use exemplar_model::TestBlock;
use exemplar_utils::PhaseId;

use crate::capabilities::{
    CandidateBlock, ExampleBundle, ExampleGenerator, ExamplePlanner, ExampleRefiner,
    GenerationRequest, PlannedExample, RefinementPatch, RefinementRequest, TestBlockExtractor,
};
use crate::prompts;

/// All four roles served by one backend.
#[derive(Clone)]
pub struct LlmCapabilities {
    backend: Arc<dyn LlmBackend>,
    model: String,
    timeout: Duration,
    profile: ExampleProfile,
}

impl LlmCapabilities {
    #[must_use]
    pub fn new(backend: Arc<dyn LlmBackend>, config: &Config) -> Self {
        Self {
            backend,
            model: config.model().unwrap_or_default().to_string(),
            timeout: config.llm_timeout(),
            profile: config.example.clone(),
        }
    }

    fn invocation(&self, phase: PhaseId, messages: Vec<Message>) -> LlmInvocation {
        LlmInvocation::new(phase.as_str(), self.model.clone(), self.timeout, messages)
    }
}

#[derive(Debug, Deserialize)]
struct ExtractionResponse {
    blocks: Vec<TestBlock>,
}

impl StructuredOutput for ExtractionResponse {
    fn validate(&self) -> Result<(), String> {
        self.blocks.iter().try_for_each(TestBlock::validate)
    }
}

#[derive(Debug, Deserialize)]
struct PlanningResponse {
    examples: Vec<PlannedExample>,
}

impl StructuredOutput for PlanningResponse {
    fn validate(&self) -> Result<(), String> {
        self.examples.iter().try_for_each(PlannedExample::validate)
    }
}

#[async_trait]
impl TestBlockExtractor for LlmCapabilities {
    async fn extract(&self, source_file: &str, content: &str) -> Result<Vec<TestBlock>, LlmError> {
        let inv = self
            .invocation(PhaseId::Extraction, prompts::extraction(source_file, content))
            .with_metadata("source_file", serde_json::Value::String(source_file.to_string()));
        let response: ExtractionResponse = invoke_structured(self.backend.as_ref(), inv).await?;
        Ok(response.blocks)
    }
}

#[async_trait]
impl ExamplePlanner for LlmCapabilities {
    async fn plan(&self, candidates: &[CandidateBlock]) -> Result<Vec<PlannedExample>, LlmError> {
        let inv = self.invocation(
            PhaseId::Distillation,
            prompts::planning(candidates, &self.profile),
        );
        let response: PlanningResponse = invoke_structured(self.backend.as_ref(), inv).await?;
        Ok(response.examples)
    }
}

#[async_trait]
impl ExampleGenerator for LlmCapabilities {
    async fn generate(&self, request: &GenerationRequest) -> Result<ExampleBundle, LlmError> {
        let inv = self
            .invocation(PhaseId::Generation, prompts::generation(request))
            .with_metadata(
                "example_id",
                serde_json::Value::String(request.plan.example_id.clone()),
            );
        invoke_structured(self.backend.as_ref(), inv).await
    }
}

#[async_trait]
impl ExampleRefiner for LlmCapabilities {
    async fn refine(&self, request: &RefinementRequest) -> Result<RefinementPatch, LlmError> {
        let inv = self
            .invocation(PhaseId::Refinement, prompts::refinement(request))
            .with_metadata(
                "example_id",
                serde_json::Value::String(request.example_id.clone()),
            );
        invoke_structured(self.backend.as_ref(), inv).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exemplar_llm::test_support::ScriptedBackend;

    #[tokio::test]
    async fn extraction_validates_blocks() {
        let backend = Arc::new(ScriptedBackend::new().reply(
            r#"{"blocks": [{"name": "", "classification": "internal", "example_potential": "low", "complexity": "simple"}]}"#,
        ));
        let caps = LlmCapabilities::new(backend.clone(), &Config::minimal_for_testing());

        let err = caps.extract("a.test.ts", "it('x')").await.unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
        assert_eq!(backend.call_count(), 1);
        assert_eq!(backend.invocations()[0].phase_id, "extraction");
    }

    #[tokio::test]
    async fn planning_parses_examples() {
        let backend = Arc::new(ScriptedBackend::new().reply(
            r#"```json
{"examples": [{"title": "Create a client", "complexity": "simple", "example_potential": "high",
  "source_tests": [{"file": "a.test.ts", "test_name": "creates"}]}]}
```"#,
        ));
        let caps = LlmCapabilities::new(backend, &Config::minimal_for_testing());

        let plans = caps.plan(&[]).await.unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].title, "Create a client");
    }
}
