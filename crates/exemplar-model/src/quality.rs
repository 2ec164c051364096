use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Critical and high issues are the ones refinement tries to fix.
    #[must_use]
    pub const fn requires_refinement(self) -> bool {
        matches!(self, Self::Critical | Self::High)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fixed quality battery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityCheck {
    Completeness,
    ApiUsage,
    LanguageCompliance,
    Artifacts,
    Runability,
}

impl QualityCheck {
    pub const ALL: [QualityCheck; 5] = [
        QualityCheck::Completeness,
        QualityCheck::ApiUsage,
        QualityCheck::LanguageCompliance,
        QualityCheck::Artifacts,
        QualityCheck::Runability,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityIssue {
    #[serde(rename = "type")]
    pub issue_type: String,
    pub severity: Severity,
    pub description: String,
    pub recommendation: String,
    pub originating_check: QualityCheck,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub check: QualityCheck,
    pub passed: bool,
}

/// Per-example result: pass/fail plus itemized issues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleQuality {
    pub example_id: String,
    pub folder: String,
    /// True iff every check passed.
    pub passed: bool,
    pub checks: Vec<CheckResult>,
    pub issues: Vec<QualityIssue>,
}

impl ExampleQuality {
    #[must_use]
    pub fn has_blocking_issue(&self) -> bool {
        self.issues.iter().any(|i| i.severity.requires_refinement())
    }

    /// Critical and high issues only.
    pub fn blocking_issues(&self) -> impl Iterator<Item = &QualityIssue> {
        self.issues.iter().filter(|i| i.severity.requires_refinement())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityCounts {
    pub fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
        }
    }

    #[must_use]
    pub const fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low
    }
}

/// Examples that passed each check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckPassCounts {
    pub completeness: usize,
    pub api_usage: usize,
    pub language_compliance: usize,
    pub artifacts: usize,
    pub runability: usize,
}

impl CheckPassCounts {
    pub fn add(&mut self, check: QualityCheck) {
        match check {
            QualityCheck::Completeness => self.completeness += 1,
            QualityCheck::ApiUsage => self.api_usage += 1,
            QualityCheck::LanguageCompliance => self.language_compliance += 1,
            QualityCheck::Artifacts => self.artifacts += 1,
            QualityCheck::Runability => self.runability += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualitySummary {
    pub validated: usize,
    pub passed: usize,
    pub failed: usize,
    pub issues: SeverityCounts,
    #[serde(default)]
    pub checks_passed: CheckPassCounts,
}

impl QualitySummary {
    #[must_use]
    pub fn from_examples(examples: &[ExampleQuality]) -> Self {
        let mut summary = Self {
            validated: examples.len(),
            ..Self::default()
        };
        for example in examples {
            if example.passed {
                summary.passed += 1;
            } else {
                summary.failed += 1;
            }
            for issue in &example.issues {
                summary.issues.add(issue.severity);
            }
            for check in example.checks.iter().filter(|c| c.passed) {
                summary.checks_passed.add(check.check);
            }
        }
        summary
    }

    /// Fraction of validated examples that failed; zero when none were validated.
    #[must_use]
    pub fn failure_rate(&self) -> f64 {
        if self.validated == 0 {
            0.0
        } else {
            self.failed as f64 / self.validated as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityDocument {
    #[serde(default = "crate::default_schema_version")]
    pub schema_version: u32,
    pub generated_at: DateTime<Utc>,
    pub iteration: u32,
    pub examples: Vec<ExampleQuality>,
    pub summary: QualitySummary,
    pub should_trigger_refinement: bool,
    pub trigger_reason: String,
    /// `<example id>: <recommendation>` for each distinct critical/high
    /// issue when refinement triggers; otherwise a single all-clear line.
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(severity: Severity) -> QualityIssue {
        QualityIssue {
            issue_type: "t".into(),
            severity,
            description: String::new(),
            recommendation: String::new(),
            originating_check: QualityCheck::Completeness,
        }
    }

    #[test]
    fn summary_counts_severities_across_examples() {
        let examples = vec![
            ExampleQuality {
                example_id: "01-a".into(),
                folder: "01-a".into(),
                passed: false,
                checks: vec![],
                issues: vec![issue(Severity::Critical), issue(Severity::Medium)],
            },
            ExampleQuality {
                example_id: "02-b".into(),
                folder: "02-b".into(),
                passed: true,
                checks: vec![],
                issues: vec![],
            },
        ];
        let s = QualitySummary::from_examples(&examples);
        assert_eq!(s.validated, 2);
        assert_eq!(s.failed, 1);
        assert_eq!(s.issues.critical, 1);
        assert_eq!(s.issues.medium, 1);
        assert_eq!(s.issues.total(), 2);
        assert!((s.failure_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn blocking_issues_are_critical_or_high() {
        let q = ExampleQuality {
            example_id: "01-a".into(),
            folder: "01-a".into(),
            passed: false,
            checks: vec![],
            issues: vec![issue(Severity::Low), issue(Severity::High)],
        };
        assert!(q.has_blocking_issue());
        assert_eq!(q.blocking_issues().count(), 1);
    }

    #[test]
    fn summary_counts_passed_checks() {
        let examples = vec![ExampleQuality {
            example_id: "01-a".into(),
            folder: "01-a".into(),
            passed: false,
            checks: vec![
                CheckResult { check: QualityCheck::Completeness, passed: false },
                CheckResult { check: QualityCheck::ApiUsage, passed: true },
                CheckResult { check: QualityCheck::Runability, passed: true },
            ],
            issues: vec![issue(Severity::Critical)],
        }];
        let s = QualitySummary::from_examples(&examples);
        assert_eq!(s.checks_passed.completeness, 0);
        assert_eq!(s.checks_passed.api_usage, 1);
        assert_eq!(s.checks_passed.runability, 1);
    }

    #[test]
    fn failure_rate_of_empty_summary_is_zero() {
        assert_eq!(QualitySummary::default().failure_rate(), 0.0);
    }
}
