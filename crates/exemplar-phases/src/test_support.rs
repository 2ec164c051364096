//! In-memory capabilities that record their calls.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use exemplar_llm::LlmError;
use exemplar_model::{
    Classification, Complexity, ExamplePotential, LineRange, SourceTestRef, TestBlock,
};

use crate::capabilities::{
    CandidateBlock, ExampleBundle, ExampleGenerator, ExamplePlanner, ExampleRefiner,
    GenerationRequest, PlannedExample, RefinementPatch, RefinementRequest, TestBlockExtractor,
};

/// A user-facing, simple test block.
#[must_use]
pub fn block(name: &str, potential: ExamplePotential) -> TestBlock {
    TestBlock {
        name: name.to_string(),
        source_line_range: LineRange { start: 1, end: 3 },
        features_tested: vec!["basics".to_string()],
        classification: Classification::UserFacing,
        use_case: Some(format!("use {name}")),
        target_users: vec!["developers".to_string()],
        example_potential: potential,
        complexity: Complexity::Simple,
        prerequisites: Vec::new(),
        key_concepts: Vec::new(),
        user_value: None,
    }
}

/// Returns one high-potential block named `"<file> works"` per file.
#[derive(Debug, Default)]
pub struct FakeExtractor {
    failing: HashSet<String>,
    delay: Option<Duration>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<String>>,
    completed: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failing(mut self, file: &str) -> Self {
        self.failing.insert(file.to_string());
        self
    }

    #[must_use]
    pub fn with_delay_ms(mut self, ms: u64) -> Self {
        self.delay = Some(Duration::from_millis(ms));
        self
    }

    /// Delay for one file, overriding [`with_delay_ms`](Self::with_delay_ms).
    #[must_use]
    pub fn with_delay_for(mut self, file: &str, ms: u64) -> Self {
        self.delays.insert(file.to_string(), Duration::from_millis(ms));
        self
    }

    /// Files in the order their analysis finished.
    pub fn completion_order(&self) -> Vec<String> {
        self.completed.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }

    pub fn calls_for(&self, file: &str) -> usize {
        self.calls
            .lock()
            .map(|c| c.iter().filter(|f| f.as_str() == file).count())
            .unwrap_or_default()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TestBlockExtractor for FakeExtractor {
    async fn extract(&self, source_file: &str, _content: &str) -> Result<Vec<TestBlock>, LlmError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(source_file.to_string());
        }
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(source_file).copied().or(self.delay) {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if let Ok(mut completed) = self.completed.lock() {
            completed.push(source_file.to_string());
        }

        if self.failing.contains(source_file) {
            return Err(LlmError::Transport(format!("scripted failure for {source_file}")));
        }
        Ok(vec![block(&format!("{source_file} works"), ExamplePotential::High)])
    }
}

/// Plans one example per candidate, titled after the test name, unless
/// a fixed answer or failure is scripted.
#[derive(Debug, Default)]
pub struct FakePlanner {
    fixed: Option<Vec<PlannedExample>>,
    fail: bool,
    calls: Mutex<Vec<Vec<CandidateBlock>>>,
}

impl FakePlanner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn returning(mut self, plans: Vec<PlannedExample>) -> Self {
        self.fixed = Some(plans);
        self
    }

    #[must_use]
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }

    /// Candidates offered on the most recent call.
    pub fn last_candidates(&self) -> Vec<CandidateBlock> {
        self.calls
            .lock()
            .ok()
            .and_then(|c| c.last().cloned())
            .unwrap_or_default()
    }
}

/// A planned example referencing the given tests.
#[must_use]
pub fn planned(title: &str, complexity: Complexity, tests: &[(&str, &str)]) -> PlannedExample {
    PlannedExample {
        title: title.to_string(),
        summary: format!("Shows how to {}", title.to_lowercase()),
        language: String::new(),
        complexity,
        example_potential: ExamplePotential::High,
        prerequisites: Vec::new(),
        run_instructions: "npm start".to_string(),
        expected_output: vec!["done".to_string()],
        source_tests: tests
            .iter()
            .map(|(file, name)| SourceTestRef {
                file: (*file).to_string(),
                test_name: (*name).to_string(),
            })
            .collect(),
        artifacts_plan: Vec::new(),
    }
}

#[async_trait]
impl ExamplePlanner for FakePlanner {
    async fn plan(&self, candidates: &[CandidateBlock]) -> Result<Vec<PlannedExample>, LlmError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(candidates.to_vec());
        }
        if self.fail {
            return Err(LlmError::ProviderOutage("scripted planner outage".to_string()));
        }
        if let Some(fixed) = &self.fixed {
            return Ok(fixed.clone());
        }
        Ok(candidates
            .iter()
            .map(|c| {
                planned(
                    &c.block.name,
                    c.block.complexity,
                    &[(c.source_file.as_str(), c.block.name.as_str())],
                )
            })
            .collect())
    }
}

/// Produces a complete, clean bundle for the default profile.
#[derive(Debug, Default)]
pub struct FakeGenerator {
    failing: HashSet<String>,
    calls: Mutex<Vec<GenerationRequest>>,
}

impl FakeGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail for plans whose title matches.
    #[must_use]
    pub fn failing(mut self, title: &str) -> Self {
        self.failing.insert(title.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    #[must_use]
    pub fn clean_bundle(package: &str) -> ExampleBundle {
        ExampleBundle {
            main: format!("import {{ connect }} from '{package}';\n\nconst client = connect();\nconsole.log('connected', client.ready);\n"),
            readme: "# Example\n\nRun `npm start`.\n".to_string(),
            manifest: format!(
                "{{\n  \"name\": \"example\",\n  \"type\": \"module\",\n  \"scripts\": {{ \"start\": \"tsx index.ts\" }},\n  \"dependencies\": {{ \"{package}\": \"workspace:*\" }}\n}}\n"
            ),
            config: Some("{ \"compilerOptions\": { \"module\": \"esnext\" } }\n".to_string()),
            env_template: None,
        }
    }
}

#[async_trait]
impl ExampleGenerator for FakeGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<ExampleBundle, LlmError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.clone());
        }
        if self.failing.contains(&request.plan.title) {
            return Err(LlmError::InvalidResponse(format!(
                "scripted failure for {}",
                request.plan.title
            )));
        }
        let package = request.package_name.as_deref().unwrap_or("demo-lib");
        Ok(Self::clean_bundle(package))
    }
}

/// Rewrites the main file, failing for scripted example ids.
#[derive(Debug, Default)]
pub struct FakeRefiner {
    failing: HashSet<String>,
    calls: Mutex<Vec<RefinementRequest>>,
}

impl FakeRefiner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failing(mut self, example_id: &str) -> Self {
        self.failing.insert(example_id.to_string());
        self
    }

    pub fn requested_ids(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|c| c.iter().map(|r| r.example_id.clone()).collect())
            .unwrap_or_default()
    }

    pub fn requests(&self) -> Vec<RefinementRequest> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

/// Content [`FakeRefiner`] writes into the main file.
pub const REFINED_MAIN: &str = "console.log('refined');\n";

#[async_trait]
impl ExampleRefiner for FakeRefiner {
    async fn refine(&self, request: &RefinementRequest) -> Result<RefinementPatch, LlmError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.clone());
        }
        if self.failing.contains(&request.example_id) {
            return Err(LlmError::Transport("scripted refinement failure".to_string()));
        }
        Ok(RefinementPatch {
            main: Some(REFINED_MAIN.to_string()),
            ..RefinementPatch::default()
        })
    }
}
