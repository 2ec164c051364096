use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a test file relative to the previous discovery run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Created,
    Updated,
    Unchanged,
    Deleted,
}

impl FileStatus {
    /// Whether the file's content must be (re)analysed.
    #[must_use]
    pub const fn needs_analysis(self) -> bool {
        matches!(self, Self::Created | Self::Updated)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
            Self::Deleted => "deleted",
        }
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestFileRecord {
    /// Repo-relative, forward slashes. Join key for every later phase.
    pub path: String,
    pub fingerprint: String,
    pub status: FileStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoverySummary {
    /// Files currently present (deleted records excluded).
    pub total_discovered: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
}

impl DiscoverySummary {
    #[must_use]
    pub fn from_records(records: &[TestFileRecord]) -> Self {
        let mut summary = Self::default();
        for record in records {
            match record.status {
                FileStatus::Created => summary.created += 1,
                FileStatus::Updated => summary.updated += 1,
                FileStatus::Unchanged => summary.unchanged += 1,
                FileStatus::Deleted => summary.deleted += 1,
            }
        }
        summary.total_discovered = summary.created + summary.updated + summary.unchanged;
        summary
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryDocument {
    #[serde(default = "crate::default_schema_version")]
    pub schema_version: u32,
    pub generated_at: DateTime<Utc>,
    pub repository: String,
    /// Sorted by path.
    pub files: Vec<TestFileRecord>,
    pub summary: DiscoverySummary,
}

impl DiscoveryDocument {
    #[must_use]
    pub fn find(&self, path: &str) -> Option<&TestFileRecord> {
        self.files.iter().find(|f| f.path == path)
    }

    /// Status of `path` in this run, if it was seen at all.
    #[must_use]
    pub fn status_of(&self, path: &str) -> Option<FileStatus> {
        self.find(path).map(|f| f.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str, status: FileStatus) -> TestFileRecord {
        TestFileRecord {
            path: path.into(),
            fingerprint: "f".into(),
            status,
            last_modified: None,
        }
    }

    #[test]
    fn summary_excludes_deleted_from_total() {
        let records = vec![
            record("a", FileStatus::Created),
            record("b", FileStatus::Unchanged),
            record("c", FileStatus::Deleted),
        ];
        let summary = DiscoverySummary::from_records(&records);
        assert_eq!(summary.total_discovered, 2);
        assert_eq!(summary.deleted, 1);
        assert_eq!(summary.created, 1);
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&FileStatus::Unchanged).unwrap();
        assert_eq!(json, "\"unchanged\"");
    }

    #[test]
    fn needs_analysis_only_for_new_or_changed() {
        assert!(FileStatus::Created.needs_analysis());
        assert!(FileStatus::Updated.needs_analysis());
        assert!(!FileStatus::Unchanged.needs_analysis());
        assert!(!FileStatus::Deleted.needs_analysis());
    }
}
