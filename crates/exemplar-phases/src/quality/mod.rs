//! Quality: run the check battery over every generated example and decide
//! whether refinement should run.

pub mod checks;

use camino::Utf8Path;
use chrono::Utc;
use tracing::{debug, info};

use exemplar_config::ExampleProfile;
use exemplar_model::{
    CheckResult, ExampleQuality, GeneratedExample, GenerationDocument, QualityCheck,
    QualityDocument, QualitySummary, SCHEMA_VERSION,
};
use exemplar_runner::ExampleRunner;

/// Knobs for one quality run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityOptions {
    pub iteration: u32,
    /// When false the runability check passes without running anything.
    pub execute: bool,
    pub failure_threshold: f64,
}

/// Validate every example in `generation` whose status is validatable.
pub async fn assess(
    generation: &GenerationDocument,
    examples_dir: &Utf8Path,
    profile: &ExampleProfile,
    package_name: Option<&str>,
    options: QualityOptions,
    runner: &dyn ExampleRunner,
) -> QualityDocument {
    let mut examples = Vec::new();
    for example in generation.examples.iter().filter(|e| e.status.is_validatable()) {
        examples.push(assess_one(example, examples_dir, profile, package_name, options, runner).await);
    }

    let summary = QualitySummary::from_examples(&examples);
    let (should_trigger_refinement, trigger_reason) =
        evaluate_trigger(&summary, options.failure_threshold);
    let recommendations = recommendations(&examples, should_trigger_refinement);

    info!(
        iteration = options.iteration,
        validated = summary.validated,
        passed = summary.passed,
        failed = summary.failed,
        critical = summary.issues.critical,
        high = summary.issues.high,
        trigger = should_trigger_refinement,
        "Quality assessment complete"
    );

    QualityDocument {
        schema_version: SCHEMA_VERSION,
        generated_at: Utc::now(),
        iteration: options.iteration,
        examples,
        summary,
        should_trigger_refinement,
        trigger_reason,
        recommendations,
    }
}

async fn assess_one(
    example: &GeneratedExample,
    examples_dir: &Utf8Path,
    profile: &ExampleProfile,
    package_name: Option<&str>,
    options: QualityOptions,
    runner: &dyn ExampleRunner,
) -> ExampleQuality {
    let dir = examples_dir.join(&example.folder);
    let dir = dir.as_std_path();

    let mut checks = Vec::with_capacity(QualityCheck::ALL.len());
    let mut issues = Vec::new();
    for check in QualityCheck::ALL {
        let found = match check {
            QualityCheck::Completeness => checks::completeness(dir, profile),
            QualityCheck::ApiUsage => checks::api_usage(dir, profile, package_name),
            QualityCheck::LanguageCompliance => checks::language_compliance(dir, profile),
            QualityCheck::Artifacts => checks::artifacts(dir),
            QualityCheck::Runability => checks::runability(dir, runner, options.execute).await,
        };
        checks.push(CheckResult {
            check,
            passed: found.is_empty(),
        });
        issues.extend(found);
    }

    let passed = checks.iter().all(|c| c.passed);
    debug!(example_id = %example.example_id, passed, issues = issues.len(), "Assessed example");
    ExampleQuality {
        example_id: example.example_id.clone(),
        folder: example.folder.clone(),
        passed,
        checks,
        issues,
    }
}

/// Message recorded when nothing needs fixing.
pub const ALL_PASSED: &str = "All examples passed validation successfully";

/// Distinct `<example id>: <recommendation>` lines for critical and high
/// issues, in example order. Only populated when refinement triggers.
#[must_use]
pub fn recommendations(examples: &[ExampleQuality], should_refine: bool) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    if should_refine {
        for example in examples {
            for issue in example.blocking_issues() {
                let line = format!("{}: {}", example.example_id, issue.recommendation);
                if !lines.contains(&line) {
                    lines.push(line);
                }
            }
        }
    }
    if lines.is_empty() {
        lines.push(ALL_PASSED.to_string());
    }
    lines
}

/// Whether refinement should run, and which rule decided.
///
/// Rules in order, first match wins: any critical issue, any high issue,
/// failure rate strictly above `threshold`.
#[must_use]
pub fn evaluate_trigger(summary: &QualitySummary, threshold: f64) -> (bool, String) {
    if summary.issues.critical > 0 {
        return (
            true,
            format!("{} critical issues present", summary.issues.critical),
        );
    }
    if summary.issues.high > 0 {
        return (
            true,
            format!("{} high severity issues present", summary.issues.high),
        );
    }
    let rate = summary.failure_rate();
    if rate > threshold {
        return (
            true,
            format!(
                "failure rate {:.0}% exceeds failure threshold of {:.0}%",
                rate * 100.0,
                threshold * 100.0
            ),
        );
    }
    (false, "quality criteria met".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeGenerator;
    use camino::Utf8PathBuf;
    use exemplar_model::{GenerationStatus, GenerationSummary, Severity, SeverityCounts};
    use exemplar_runner::test_support::ScriptedRunner;
    use std::fs;
    use tempfile::TempDir;

    fn summary(validated: usize, failed: usize, critical: usize, high: usize) -> QualitySummary {
        QualitySummary {
            validated,
            passed: validated - failed,
            failed,
            issues: SeverityCounts {
                critical,
                high,
                ..SeverityCounts::default()
            },
            ..QualitySummary::default()
        }
    }

    #[test]
    fn critical_wins_even_below_threshold() {
        let (trigger, reason) = evaluate_trigger(&summary(10, 1, 1, 0), 0.2);
        assert!(trigger);
        assert!(reason.contains("critical"));
    }

    #[test]
    fn high_triggers_when_no_critical() {
        let (trigger, reason) = evaluate_trigger(&summary(10, 1, 0, 2), 0.2);
        assert!(trigger);
        assert!(reason.contains("high"));
    }

    #[test]
    fn failure_rate_above_threshold_triggers() {
        let (trigger, reason) = evaluate_trigger(&summary(4, 1, 0, 0), 0.2);
        assert!(trigger);
        assert!(reason.contains("failure threshold"));
    }

    #[test]
    fn rate_at_threshold_does_not_trigger() {
        let (trigger, _) = evaluate_trigger(&summary(5, 1, 0, 0), 0.2);
        assert!(!trigger);
    }

    #[test]
    fn clean_run_does_not_trigger() {
        let (trigger, _) = evaluate_trigger(&summary(10, 0, 0, 0), 0.2);
        assert!(!trigger);
        let (trigger, _) = evaluate_trigger(&summary(0, 0, 0, 0), 0.2);
        assert!(!trigger);
    }

    fn rated(id: &str, issues: Vec<(Severity, &str)>) -> ExampleQuality {
        ExampleQuality {
            example_id: id.into(),
            folder: id.into(),
            passed: issues.is_empty(),
            checks: vec![],
            issues: issues
                .into_iter()
                .map(|(severity, recommendation)| exemplar_model::QualityIssue {
                    issue_type: "t".into(),
                    severity,
                    description: String::new(),
                    recommendation: recommendation.into(),
                    originating_check: QualityCheck::Completeness,
                })
                .collect(),
        }
    }

    #[test]
    fn recommendations_list_distinct_blocking_issues_per_example() {
        let examples = vec![
            rated(
                "01-a",
                vec![
                    (Severity::Critical, "add package.json"),
                    (Severity::High, "import the package"),
                    (Severity::Critical, "add package.json"),
                    (Severity::Medium, "tidy the README"),
                ],
            ),
            rated("02-b", vec![(Severity::High, "import the package")]),
        ];

        assert_eq!(
            recommendations(&examples, true),
            vec![
                "01-a: add package.json".to_string(),
                "01-a: import the package".to_string(),
                "02-b: import the package".to_string(),
            ]
        );
    }

    #[test]
    fn recommendations_fall_back_to_all_clear() {
        let examples = vec![rated("01-a", vec![(Severity::Critical, "add package.json")])];
        assert_eq!(recommendations(&examples, false), vec![ALL_PASSED.to_string()]);

        let only_minor = vec![rated("01-a", vec![(Severity::Low, "rename x")])];
        assert_eq!(recommendations(&only_minor, true), vec![ALL_PASSED.to_string()]);
    }

    struct Fixture {
        _dir: TempDir,
        examples: Utf8PathBuf,
    }

    fn fixture(folders: &[(&str, bool)]) -> (Fixture, GenerationDocument) {
        let dir = TempDir::new().unwrap();
        let examples = Utf8PathBuf::from_path_buf(dir.path().join("examples")).unwrap();
        let bundle = FakeGenerator::clean_bundle("demo-lib");
        let mut generated = Vec::new();
        for (folder, with_manifest) in folders {
            let root = examples.join(folder);
            fs::create_dir_all(&root).unwrap();
            fs::write(root.join("index.ts"), &bundle.main).unwrap();
            fs::write(root.join("README.md"), &bundle.readme).unwrap();
            fs::write(root.join("tsconfig.json"), bundle.config.as_deref().unwrap()).unwrap();
            if *with_manifest {
                fs::write(root.join("package.json"), &bundle.manifest).unwrap();
            }
            generated.push(GeneratedExample {
                example_id: (*folder).to_string(),
                folder: (*folder).to_string(),
                status: GenerationStatus::Generated,
                generated_files: vec![],
                generated_artifacts: vec![],
                notes: vec![],
            });
        }
        generated.push(GeneratedExample {
            example_id: "99-broken".into(),
            folder: "99-broken".into(),
            status: GenerationStatus::Error,
            generated_files: vec![],
            generated_artifacts: vec![],
            notes: vec!["boom".into()],
        });
        let summary = GenerationSummary::from_examples(&generated, 0);
        let doc = GenerationDocument {
            schema_version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            examples_dir: examples.to_string(),
            examples: generated,
            summary,
        };
        (Fixture { _dir: dir, examples }, doc)
    }

    fn options() -> QualityOptions {
        QualityOptions {
            iteration: 0,
            execute: true,
            failure_threshold: 0.2,
        }
    }

    #[tokio::test]
    async fn clean_examples_pass_every_check() {
        let (fx, doc) = fixture(&[("01-ok", true)]);
        let runner = ScriptedRunner::new();

        let quality = assess(&doc, &fx.examples, &ExampleProfile::default(), Some("demo-lib"), options(), &runner).await;

        assert_eq!(quality.summary.validated, 1);
        assert!(quality.examples[0].passed);
        assert_eq!(quality.examples[0].checks.len(), 5);
        assert!(!quality.should_trigger_refinement);
        assert_eq!(quality.recommendations, vec![ALL_PASSED.to_string()]);
        assert_eq!(quality.summary.checks_passed.runability, 1);
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn missing_manifest_is_one_critical_issue() {
        let (fx, doc) = fixture(&[("01-ok", true), ("02-no-manifest", false)]);

        let quality = assess(
            &doc,
            &fx.examples,
            &ExampleProfile::default(),
            Some("demo-lib"),
            options(),
            &ScriptedRunner::new(),
        )
        .await;

        let broken = quality.examples.iter().find(|e| e.example_id == "02-no-manifest").unwrap();
        assert!(!broken.passed);
        assert_eq!(broken.issues.len(), 1);
        assert_eq!(broken.issues[0].issue_type, "missing_file");
        assert_eq!(broken.issues[0].severity, Severity::Critical);
        assert_eq!(quality.summary.issues.critical, 1);
        assert!(quality.should_trigger_refinement);
        assert!(quality.trigger_reason.contains("critical"));
        assert_eq!(quality.recommendations.len(), 1);
        assert!(quality.recommendations[0].starts_with("02-no-manifest: "));
        assert_eq!(quality.summary.checks_passed.completeness, 1);
    }

    #[tokio::test]
    async fn error_examples_are_not_validated() {
        let (fx, doc) = fixture(&[]);
        let quality = assess(
            &doc,
            &fx.examples,
            &ExampleProfile::default(),
            None,
            options(),
            &ScriptedRunner::new(),
        )
        .await;
        assert_eq!(quality.summary.validated, 0);
        assert!(!quality.should_trigger_refinement);
    }

    #[tokio::test]
    async fn runtime_failure_fails_only_runability() {
        let (fx, doc) = fixture(&[("01-crashes", true)]);
        let runner = ScriptedRunner::new().failing("01-", "node exited with code 1");

        let quality = assess(&doc, &fx.examples, &ExampleProfile::default(), Some("demo-lib"), options(), &runner).await;

        let example = &quality.examples[0];
        let failed: Vec<QualityCheck> = example.checks.iter().filter(|c| !c.passed).map(|c| c.check).collect();
        assert_eq!(failed, vec![QualityCheck::Runability]);
        assert_eq!(example.issues[0].issue_type, "runtime_failure");
    }
}
