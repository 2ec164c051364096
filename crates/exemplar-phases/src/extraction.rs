//! Extraction: decompose changed test files into test blocks, reusing the
//! previous analysis for files whose content did not change.

use chrono::Utc;
use futures::future::join_all;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use exemplar_model::{
    DiscoveryDocument, ExtractionDocument, ExtractionSummary, FileStatus, SCHEMA_VERSION,
    TestFileAnalysis, TestFileRecord,
};

use crate::capabilities::TestBlockExtractor;

/// Run extraction for every file in `discovery`.
///
/// Files needing analysis go to `extractor` in batches of `batch_size`,
/// concurrently within a batch and one batch at a time. Per-file failures
/// become empty analyses carrying the error; they never abort the run.
pub async fn extract(
    repo_root: &Path,
    discovery: &DiscoveryDocument,
    previous: Option<&ExtractionDocument>,
    extractor: &dyn TestBlockExtractor,
    batch_size: usize,
) -> ExtractionDocument {
    let batch_size = batch_size.max(1);
    let mut slots: Vec<Option<TestFileAnalysis>> = vec![None; discovery.files.len()];
    let mut pending: Vec<(usize, &TestFileRecord)> = Vec::new();
    let mut reused = 0;

    for (index, record) in discovery.files.iter().enumerate() {
        match record.status {
            FileStatus::Deleted => {
                slots[index] = Some(TestFileAnalysis {
                    source_file: record.path.clone(),
                    file_status: FileStatus::Deleted,
                    blocks: Vec::new(),
                    error: None,
                    reanalyzed: false,
                });
            }
            FileStatus::Unchanged => match previous.and_then(|p| p.find(&record.path)) {
                Some(prior) if prior.error.is_none() => {
                    debug!(file = %record.path, blocks = prior.blocks.len(), "Reusing previous analysis");
                    reused += 1;
                    slots[index] = Some(TestFileAnalysis {
                        source_file: record.path.clone(),
                        file_status: FileStatus::Unchanged,
                        blocks: prior.blocks.clone(),
                        error: None,
                        reanalyzed: false,
                    });
                }
                // No usable prior analysis: analyse it as if new.
                _ => pending.push((index, record)),
            },
            FileStatus::Created | FileStatus::Updated => pending.push((index, record)),
        }
    }

    let analyzed = pending.len();
    info!(
        to_analyze = analyzed,
        reused,
        batch_size,
        "Extracting test blocks"
    );

    for (batch_no, batch) in pending.chunks(batch_size).enumerate() {
        debug!(batch = batch_no + 1, size = batch.len(), "Starting extraction batch");
        let futures = batch
            .iter()
            .map(|(_, record)| analyze_file(repo_root, record, extractor));
        // join_all preserves input order, so results[i] belongs to batch[i].
        let results = join_all(futures).await;
        for ((index, _), analysis) in batch.iter().zip(results) {
            slots[*index] = Some(analysis);
        }
    }

    let files: Vec<TestFileAnalysis> = slots.into_iter().flatten().collect();
    let mut summary = ExtractionSummary::from_analyses(&files);
    summary.analyzed = analyzed;
    summary.reused = reused;

    info!(
        files = summary.total_files,
        blocks = summary.total_blocks,
        failed = summary.failed,
        "Extraction complete"
    );

    ExtractionDocument {
        schema_version: SCHEMA_VERSION,
        generated_at: Utc::now(),
        files,
        summary,
    }
}

async fn analyze_file(
    repo_root: &Path,
    record: &TestFileRecord,
    extractor: &dyn TestBlockExtractor,
) -> TestFileAnalysis {
    let reanalyzed = record.status == FileStatus::Unchanged;
    let failed = |error: String| {
        warn!(file = %record.path, error = %error, "Extraction failed; continuing with no blocks");
        TestFileAnalysis {
            source_file: record.path.clone(),
            file_status: record.status,
            blocks: Vec::new(),
            error: Some(error),
            reanalyzed,
        }
    };

    let content = match fs::read_to_string(repo_root.join(&record.path)) {
        Ok(content) => content,
        Err(e) => return failed(format!("could not read file: {e}")),
    };

    match extractor.extract(&record.path, &content).await {
        Ok(blocks) => {
            debug!(file = %record.path, blocks = blocks.len(), "Extracted test blocks");
            TestFileAnalysis {
                source_file: record.path.clone(),
                file_status: record.status,
                blocks,
                error: None,
                reanalyzed,
            }
        }
        Err(e) => failed(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distillation::distill;
    use crate::test_support::{FakeExtractor, FakePlanner};
    use exemplar_model::{DiscoverySummary, TestFileRecord};
    use tempfile::TempDir;

    fn record(path: &str, status: FileStatus) -> TestFileRecord {
        TestFileRecord {
            path: path.into(),
            fingerprint: format!("fp-{path}"),
            status,
            last_modified: None,
        }
    }

    fn discovery(files: Vec<TestFileRecord>) -> DiscoveryDocument {
        let summary = DiscoverySummary::from_records(&files);
        DiscoveryDocument {
            schema_version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            repository: "/repo".into(),
            files,
            summary,
        }
    }

    fn repo_with(files: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for f in files {
            fs::write(dir.path().join(f), format!("test('{f}')")).unwrap();
        }
        dir
    }

    #[tokio::test]
    async fn unchanged_files_are_copied_forward_without_calls() {
        let dir = repo_with(&["a.test.ts", "b.test.ts"]);
        let extractor = FakeExtractor::new();

        let first_disc = discovery(vec![
            record("a.test.ts", FileStatus::Created),
            record("b.test.ts", FileStatus::Created),
        ]);
        let first = extract(dir.path(), &first_disc, None, &extractor, 3).await;
        assert_eq!(extractor.calls(), 2);

        let second_disc = discovery(vec![
            record("a.test.ts", FileStatus::Unchanged),
            record("b.test.ts", FileStatus::Updated),
        ]);
        let second = extract(dir.path(), &second_disc, Some(&first), &extractor, 3).await;

        assert_eq!(extractor.calls(), 3);
        assert_eq!(extractor.calls_for("a.test.ts"), 1);
        let before = serde_json::to_string(&first.find("a.test.ts").unwrap().blocks).unwrap();
        let after = serde_json::to_string(&second.find("a.test.ts").unwrap().blocks).unwrap();
        assert_eq!(before, after);
        assert_eq!(second.summary.reused, 1);
        assert_eq!(second.summary.analyzed, 1);
        assert_eq!(second.summary.files_by_status.unchanged, 1);
        assert_eq!(second.summary.files_by_status.updated, 1);
    }

    #[tokio::test]
    async fn unchanged_without_prior_analysis_is_analyzed() {
        let dir = repo_with(&["a.test.ts"]);
        let extractor = FakeExtractor::new();
        let disc = discovery(vec![record("a.test.ts", FileStatus::Unchanged)]);

        let doc = extract(dir.path(), &disc, None, &extractor, 3).await;

        assert_eq!(extractor.calls(), 1);
        assert_eq!(doc.files[0].file_status, FileStatus::Unchanged);
        assert_eq!(doc.files[0].blocks.len(), 1);
        assert!(doc.files[0].reanalyzed);
    }

    #[tokio::test]
    async fn failed_file_recovers_on_unchanged_rerun_and_gets_planned() {
        let dir = repo_with(&["a.test.ts", "b.test.ts"]);
        let first_disc = discovery(vec![
            record("a.test.ts", FileStatus::Created),
            record("b.test.ts", FileStatus::Created),
        ]);
        let flaky = FakeExtractor::new().failing("a.test.ts");
        let first = extract(dir.path(), &first_disc, None, &flaky, 3).await;
        let first_plans = distill(&first, None, &FakePlanner::new(), "typescript")
            .await
            .unwrap();
        assert!(first.find("a.test.ts").unwrap().error.is_some());
        assert_eq!(first_plans.examples.len(), 1);

        let second_disc = discovery(vec![
            record("a.test.ts", FileStatus::Unchanged),
            record("b.test.ts", FileStatus::Unchanged),
        ]);
        let healthy = FakeExtractor::new();
        let second = extract(dir.path(), &second_disc, Some(&first), &healthy, 3).await;

        assert_eq!(healthy.calls_for("a.test.ts"), 1);
        assert_eq!(healthy.calls_for("b.test.ts"), 0);
        let recovered = second.find("a.test.ts").unwrap();
        assert!(recovered.reanalyzed);
        assert_eq!(recovered.blocks.len(), 1);

        let planner = FakePlanner::new();
        let second_plans = distill(&second, Some(&first_plans), &planner, "typescript")
            .await
            .unwrap();
        assert_eq!(planner.calls(), 1);
        let titles: Vec<&str> = second_plans.examples.iter().map(|e| e.title.as_str()).collect();
        assert!(titles.contains(&"a.test.ts works"));
        assert!(titles.contains(&"b.test.ts works"));
    }

    #[tokio::test]
    async fn deleted_files_are_carried_with_no_blocks() {
        let dir = repo_with(&[]);
        let extractor = FakeExtractor::new();
        let disc = discovery(vec![record("gone.test.ts", FileStatus::Deleted)]);

        let doc = extract(dir.path(), &disc, None, &extractor, 3).await;

        assert_eq!(extractor.calls(), 0);
        assert_eq!(doc.files[0].file_status, FileStatus::Deleted);
        assert!(doc.files[0].blocks.is_empty());
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_the_batch() {
        let dir = repo_with(&["a.test.ts", "b.test.ts", "c.test.ts"]);
        let extractor = FakeExtractor::new().failing("b.test.ts");
        let disc = discovery(vec![
            record("a.test.ts", FileStatus::Created),
            record("b.test.ts", FileStatus::Created),
            record("c.test.ts", FileStatus::Created),
        ]);

        let doc = extract(dir.path(), &disc, None, &extractor, 2).await;

        let names: Vec<&str> = doc.files.iter().map(|f| f.source_file.as_str()).collect();
        assert_eq!(names, vec!["a.test.ts", "b.test.ts", "c.test.ts"]);
        assert!(doc.files[1].blocks.is_empty());
        assert!(doc.files[1].error.is_some());
        assert_eq!(doc.files[2].blocks.len(), 1);
        assert_eq!(doc.summary.failed, 1);
    }

    #[tokio::test]
    async fn batches_run_concurrently_up_to_batch_size() {
        let files: Vec<String> = (0..7).map(|i| format!("f{i}.test.ts")).collect();
        let refs: Vec<&str> = files.iter().map(String::as_str).collect();
        let dir = repo_with(&refs);
        let extractor = FakeExtractor::new().with_delay_ms(5);
        let disc = discovery(
            files
                .iter()
                .map(|f| record(f, FileStatus::Created))
                .collect(),
        );

        let doc = extract(dir.path(), &disc, None, &extractor, 3).await;

        assert_eq!(doc.files.len(), 7);
        assert_eq!(extractor.max_in_flight(), 3);
    }

    #[tokio::test]
    async fn results_stay_aligned_when_later_files_finish_first() {
        let files = ["a.test.ts", "b.test.ts", "c.test.ts"];
        let dir = repo_with(&files);
        let extractor = FakeExtractor::new()
            .with_delay_for("a.test.ts", 60)
            .with_delay_for("b.test.ts", 30)
            .with_delay_for("c.test.ts", 1);
        let disc = discovery(files.iter().map(|f| record(f, FileStatus::Created)).collect());

        let doc = extract(dir.path(), &disc, None, &extractor, 3).await;

        assert_eq!(extractor.completion_order(), ["c.test.ts", "b.test.ts", "a.test.ts"]);
        for (analysis, name) in doc.files.iter().zip(files) {
            assert_eq!(analysis.source_file, name);
            assert_eq!(analysis.blocks[0].name, format!("{name} works"));
        }
    }
}
