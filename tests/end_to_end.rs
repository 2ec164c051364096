//! Whole-pipeline runs against a scratch repository, with in-memory
//! capabilities and a scripted runner.

use camino::Utf8PathBuf;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

use exemplar::{Capabilities, Config, DocumentStore, Pipeline, QualityDocument};
use exemplar_model::{GenerationStatus, PlanStatus};
use exemplar_phases::test_support::{FakeExtractor, FakeGenerator, FakePlanner, FakeRefiner};
use exemplar_runner::test_support::ScriptedRunner;

fn scratch_repo() -> TempDir {
    let repo = TempDir::new().unwrap();
    fs::create_dir_all(repo.path().join("src")).unwrap();
    fs::write(
        repo.path().join("src/auth.test.ts"),
        "it('logs in', async () => {\n  await login();\n});\n",
    )
    .unwrap();
    fs::write(
        repo.path().join("src/client.test.ts"),
        "it('connects', async () => {\n  await connect();\n});\n",
    )
    .unwrap();
    fs::create_dir_all(repo.path().join("node_modules/dep")).unwrap();
    fs::write(repo.path().join("node_modules/dep/x.test.ts"), "it('ignored', () => {})").unwrap();
    repo
}

fn pipeline(repo: &TempDir, out: &TempDir, config: Config, runner: ScriptedRunner) -> Pipeline {
    let out = Utf8PathBuf::from_path_buf(out.path().to_path_buf()).unwrap();
    Pipeline::new(
        DocumentStore::in_dir(out.clone()),
        config,
        repo.path(),
        out.join("examples"),
    )
    .with_capabilities(Capabilities {
        extractor: Arc::new(FakeExtractor::new()),
        planner: Arc::new(FakePlanner::new()),
        generator: Arc::new(FakeGenerator::new()),
        refiner: Arc::new(FakeRefiner::new()),
    })
    .with_runner(Arc::new(runner))
}

#[tokio::test]
async fn clean_run_produces_one_directory_per_example() {
    let repo = scratch_repo();
    let out = TempDir::new().unwrap();
    let p = pipeline(&repo, &out, Config::minimal_for_testing(), ScriptedRunner::new());

    let report = p.run_all(None).await.unwrap();

    assert_eq!(report.discovery.summary.total_discovered, 2);
    assert_eq!(report.extraction.summary.total_blocks, 2);

    let ids: Vec<&str> = report
        .distillation
        .examples
        .iter()
        .map(|e| e.example_id.as_str())
        .collect();
    assert_eq!(ids, ["01-src-auth-test-ts-works", "02-src-client-test-ts-works"]);
    assert!(report.distillation.examples.iter().all(|e| e.status == PlanStatus::Planned));

    for example in &report.generation.examples {
        assert_eq!(example.status, GenerationStatus::Generated);
        let dir = out.path().join("examples").join(&example.folder);
        assert!(dir.join("index.ts").is_file());
        assert!(dir.join("package.json").is_file());
        assert!(dir.join("README.md").is_file());
    }

    assert!(!report.quality.should_trigger_refinement);
    assert_eq!(report.quality.trigger_reason, "quality criteria met");
    assert!(report.refinements.is_empty());
}

#[tokio::test]
async fn missing_manifest_is_a_critical_issue_that_triggers_refinement() {
    let repo = scratch_repo();
    let out = TempDir::new().unwrap();
    let p = pipeline(&repo, &out, Config::minimal_for_testing(), ScriptedRunner::new());
    p.run_all(None).await.unwrap();

    fs::remove_file(out.path().join("examples/02-src-client-test-ts-works/package.json")).unwrap();
    let quality = p.run_quality(0).await.unwrap();

    assert_eq!(quality.summary.validated, 2);
    assert_eq!(quality.summary.failed, 1);
    assert_eq!(quality.summary.issues.critical, 1);
    let broken = quality
        .examples
        .iter()
        .find(|e| !e.passed)
        .unwrap();
    assert_eq!(broken.example_id, "02-src-client-test-ts-works");
    assert_eq!(broken.issues.len(), 1);
    assert_eq!(broken.issues[0].issue_type, "missing_file");
    assert!(quality.should_trigger_refinement);
    assert_eq!(quality.trigger_reason, "1 critical issues present");

    let stored: QualityDocument = p.store().read_previous().unwrap();
    assert_eq!(stored, quality);
}

#[tokio::test]
async fn unchanged_rerun_reuses_analysis_and_keeps_ids() {
    let repo = scratch_repo();
    let out = TempDir::new().unwrap();
    let p = pipeline(&repo, &out, Config::minimal_for_testing(), ScriptedRunner::new());
    let first = p.run_all(None).await.unwrap();

    let second = p.run_all(None).await.unwrap();

    assert_eq!(second.discovery.summary.unchanged, 2);
    assert_eq!(second.extraction.summary.reused, 2);
    assert_eq!(second.extraction.summary.analyzed, 0);
    let ids = |r: &exemplar::PipelineReport| {
        r.distillation
            .examples
            .iter()
            .map(|e| e.example_id.clone())
            .collect::<Vec<_>>()
    };
    assert_eq!(ids(&first), ids(&second));
    assert!(second.distillation.examples.iter().all(|e| e.status == PlanStatus::Keep));
}

#[tokio::test]
async fn runtime_failures_are_refined_until_the_budget_runs_out() {
    let repo = scratch_repo();
    let out = TempDir::new().unwrap();
    let mut config = Config::minimal_for_testing();
    config.quality.execute = true;
    config.defaults.max_iterations = Some(3);
    let p = pipeline(&repo, &out, config, ScriptedRunner::new().failing("01-", "TypeError: boom"));

    let report = p.run_all(None).await.unwrap();

    assert_eq!(report.refinements.len(), 3);
    let iterations: Vec<u32> = report.refinements.iter().map(|r| r.iteration).collect();
    assert_eq!(iterations, [1, 2, 3]);
    assert_eq!(
        report.refinements[0].entry.examples_updated,
        ["01-src-auth-test-ts-works"]
    );
    assert_eq!(report.quality.summary.passed, 1);
    assert!(report.quality.should_trigger_refinement);
    assert_eq!(report.distillation.history.len(), 3);
}
