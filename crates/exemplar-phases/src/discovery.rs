//! Discovery: enumerate test files, fingerprint them and classify each
//! against the previous discovery document.

use chrono::{DateTime, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use exemplar_config::DiscoveryConfig;
use exemplar_model::{
    DiscoveryDocument, DiscoverySummary, FileStatus, SCHEMA_VERSION, TestFileRecord,
};
use exemplar_utils::error::PhaseError;
use exemplar_utils::fingerprint::fingerprint_file;
use exemplar_utils::paths::repo_relative;
use exemplar_utils::PhaseId;

/// Compiled include/exclude filters.
#[derive(Debug, Clone)]
pub struct TestFileMatcher {
    include: GlobSet,
    exclude: GlobSet,
}

impl TestFileMatcher {
    pub fn from_config(config: &DiscoveryConfig) -> Result<Self, PhaseError> {
        Ok(Self {
            include: build_globset(&config.include)?,
            exclude: build_globset(&config.exclude)?,
        })
    }

    /// Whether a repo-relative, forward-slash path is a test file.
    #[must_use]
    pub fn is_match(&self, relative: &str) -> bool {
        self.include.is_match(relative) && !self.exclude.is_match(relative)
    }

    /// Whether a directory can be skipped without descending.
    fn prunes_dir(&self, relative: &str) -> bool {
        self.exclude.is_match(relative) || self.exclude.is_match(format!("{relative}/x"))
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, PhaseError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| PhaseError::Filesystem {
            phase: PhaseId::Discovery,
            path: pattern.clone(),
            reason: format!("invalid glob: {e}"),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| PhaseError::Filesystem {
        phase: PhaseId::Discovery,
        path: patterns.join(","),
        reason: format!("invalid glob set: {e}"),
    })
}

/// Run discovery over `repo_root`.
///
/// `limit` keeps the first N matching files by sorted path. `previous` is
/// the last discovery document, or `None` on a first run.
pub fn discover(
    repo_root: &Path,
    config: &DiscoveryConfig,
    limit: Option<usize>,
    previous: Option<&DiscoveryDocument>,
) -> Result<DiscoveryDocument, PhaseError> {
    if !repo_root.is_dir() {
        return Err(PhaseError::Filesystem {
            phase: PhaseId::Discovery,
            path: repo_root.display().to_string(),
            reason: "repository root is not a directory".to_string(),
        });
    }

    let matcher = TestFileMatcher::from_config(config)?;
    let roots: Vec<PathBuf> = if config.directories.is_empty() {
        vec![repo_root.to_path_buf()]
    } else {
        config.directories.iter().map(|d| repo_root.join(d)).collect()
    };

    let mut found: BTreeMap<String, PathBuf> = BTreeMap::new();
    for root in &roots {
        if !root.is_dir() {
            warn!(directory = %root.display(), "Configured discovery directory does not exist");
            continue;
        }
        walk(repo_root, root, &matcher, &mut found);
    }

    if let Some(limit) = limit
        && found.len() > limit
    {
        info!(found = found.len(), limit, "Limiting discovered files");
        found = found.into_iter().take(limit).collect();
    }

    let mut files = Vec::with_capacity(found.len());
    let mut seen = HashSet::new();
    for (relative, absolute) in found {
        // Present on disk, so never reported as deleted below.
        seen.insert(relative.clone());
        let fingerprint = match fingerprint_file(&absolute) {
            Ok(f) => f,
            Err(e) => {
                warn!(file = %relative, error = %e, "Skipping unreadable test file");
                if let Some(record) = carry_forward_unreadable(previous, &relative) {
                    files.push(record);
                }
                continue;
            }
        };
        let status = classify(previous, &relative, &fingerprint);
        debug!(file = %relative, status = %status, "Discovered test file");
        files.push(TestFileRecord {
            path: relative,
            fingerprint,
            status,
            last_modified: modified_time(&absolute),
        });
    }

    if let Some(previous) = previous {
        for record in &previous.files {
            // Already-deleted records are not carried again.
            if record.status == FileStatus::Deleted || seen.contains(&record.path) {
                continue;
            }
            files.push(TestFileRecord {
                path: record.path.clone(),
                fingerprint: record.fingerprint.clone(),
                status: FileStatus::Deleted,
                last_modified: record.last_modified,
            });
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    let summary = DiscoverySummary::from_records(&files);
    info!(
        total = summary.total_discovered,
        created = summary.created,
        updated = summary.updated,
        unchanged = summary.unchanged,
        deleted = summary.deleted,
        "Discovery complete"
    );

    Ok(DiscoveryDocument {
        schema_version: SCHEMA_VERSION,
        generated_at: Utc::now(),
        repository: repo_root.display().to_string(),
        files,
        summary,
    })
}

/// Status of `path` with `fingerprint` relative to the previous run.
#[must_use]
pub fn classify(previous: Option<&DiscoveryDocument>, path: &str, fingerprint: &str) -> FileStatus {
    match previous.and_then(|p| p.find(path)) {
        None => FileStatus::Created,
        // A file that was deleted last run and came back is new again.
        Some(prior) if prior.status == FileStatus::Deleted => FileStatus::Created,
        Some(prior) if prior.fingerprint == fingerprint => FileStatus::Unchanged,
        Some(_) => FileStatus::Updated,
    }
}

/// The previous record for a file that exists but could not be read this
/// run, kept as unchanged so downstream state for it survives.
fn carry_forward_unreadable(previous: Option<&DiscoveryDocument>, path: &str) -> Option<TestFileRecord> {
    let prior = previous?.find(path)?;
    if prior.status == FileStatus::Deleted {
        return None;
    }
    Some(TestFileRecord {
        path: prior.path.clone(),
        fingerprint: prior.fingerprint.clone(),
        status: FileStatus::Unchanged,
        last_modified: prior.last_modified,
    })
}

/// Symlinked files are followed; symlinked directories are not descended.
fn walk(repo_root: &Path, dir: &Path, matcher: &TestFileMatcher, found: &mut BTreeMap<String, PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(directory = %dir.display(), error = %e, "Skipping unreadable directory");
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Some(relative) = repo_relative(repo_root, &path) else {
            continue;
        };
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            if !matcher.prunes_dir(&relative) {
                walk(repo_root, &path, matcher, found);
            }
            continue;
        }
        let is_file = if file_type.is_symlink() {
            fs::metadata(&path).is_ok_and(|m| m.is_file())
        } else {
            file_type.is_file()
        };
        if is_file && matcher.is_match(&relative) {
            found.insert(relative, path);
        }
    }
}

fn modified_time(path: &Path) -> Option<DateTime<Utc>> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Utc>::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn repo() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/client.test.ts", "it('connects', () => {})");
        write(dir.path(), "src/server.spec.ts", "it('serves', () => {})");
        write(dir.path(), "src/client.ts", "export const c = 1;");
        write(dir.path(), "node_modules/dep/index.test.ts", "it('dep', () => {})");
        dir
    }

    #[test]
    fn first_run_marks_everything_created() {
        let dir = repo();
        let doc = discover(dir.path(), &DiscoveryConfig::default(), None, None).unwrap();

        let paths: Vec<&str> = doc.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["src/client.test.ts", "src/server.spec.ts"]);
        assert!(doc.files.iter().all(|f| f.status == FileStatus::Created));
        assert_eq!(doc.summary.total_discovered, 2);
    }

    #[test]
    fn rerun_without_changes_is_all_unchanged() {
        let dir = repo();
        let first = discover(dir.path(), &DiscoveryConfig::default(), None, None).unwrap();
        let second = discover(dir.path(), &DiscoveryConfig::default(), None, Some(&first)).unwrap();

        assert!(second.files.iter().all(|f| f.status == FileStatus::Unchanged));
        assert_eq!(second.summary.created, 0);
        assert_eq!(second.summary.updated, 0);
        assert_eq!(second.summary.deleted, 0);
    }

    #[test]
    fn modified_file_is_updated_with_new_fingerprint() {
        let dir = repo();
        let first = discover(dir.path(), &DiscoveryConfig::default(), None, None).unwrap();
        write(dir.path(), "src/client.test.ts", "it('connects!', () => {})");
        let second = discover(dir.path(), &DiscoveryConfig::default(), None, Some(&first)).unwrap();

        let before = first.find("src/client.test.ts").unwrap();
        let after = second.find("src/client.test.ts").unwrap();
        assert_eq!(after.status, FileStatus::Updated);
        assert_ne!(before.fingerprint, after.fingerprint);
        assert_eq!(second.status_of("src/server.spec.ts"), Some(FileStatus::Unchanged));
    }

    #[test]
    fn removed_file_is_reported_once_as_deleted() {
        let dir = repo();
        let first = discover(dir.path(), &DiscoveryConfig::default(), None, None).unwrap();
        fs::remove_file(dir.path().join("src/server.spec.ts")).unwrap();
        let second = discover(dir.path(), &DiscoveryConfig::default(), None, Some(&first)).unwrap();

        let deleted: Vec<_> = second
            .files
            .iter()
            .filter(|f| f.path == "src/server.spec.ts")
            .collect();
        assert_eq!(deleted.len(), 1);
        assert_eq!(deleted[0].status, FileStatus::Deleted);
        assert_eq!(
            deleted[0].fingerprint,
            first.find("src/server.spec.ts").unwrap().fingerprint
        );
        assert_eq!(second.summary.total_discovered, 1);
        assert_eq!(second.summary.deleted, 1);

        // A third run forgets the deletion.
        let third = discover(dir.path(), &DiscoveryConfig::default(), None, Some(&second)).unwrap();
        assert!(third.find("src/server.spec.ts").is_none());
    }

    #[test]
    fn unreadable_file_keeps_its_previous_record() {
        let dir = repo();
        let first = discover(dir.path(), &DiscoveryConfig::default(), None, None).unwrap();

        let kept = carry_forward_unreadable(Some(&first), "src/client.test.ts").unwrap();
        assert_eq!(kept.status, FileStatus::Unchanged);
        assert_eq!(kept.fingerprint, first.find("src/client.test.ts").unwrap().fingerprint);

        assert!(carry_forward_unreadable(Some(&first), "src/new.test.ts").is_none());
        assert!(carry_forward_unreadable(None, "src/client.test.ts").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_file_is_not_reported_deleted() {
        use std::os::unix::fs::PermissionsExt;

        let dir = repo();
        let first = discover(dir.path(), &DiscoveryConfig::default(), None, None).unwrap();
        let target = dir.path().join("src/client.test.ts");
        fs::set_permissions(&target, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read(&target).is_ok() {
            // Permission bits do not bind this user (root); nothing to observe.
            fs::set_permissions(&target, fs::Permissions::from_mode(0o644)).unwrap();
            return;
        }

        let second = discover(dir.path(), &DiscoveryConfig::default(), None, Some(&first)).unwrap();
        fs::set_permissions(&target, fs::Permissions::from_mode(0o644)).unwrap();

        assert_eq!(second.status_of("src/client.test.ts"), Some(FileStatus::Unchanged));
        assert_eq!(second.summary.deleted, 0);
        assert_eq!(
            second.files.iter().filter(|f| f.path == "src/client.test.ts").count(),
            1
        );
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_test_files_are_discovered() {
        let dir = repo();
        write(dir.path(), "shared/real.ts", "it('linked', () => {})");
        std::os::unix::fs::symlink(
            dir.path().join("shared/real.ts"),
            dir.path().join("src/linked.test.ts"),
        )
        .unwrap();

        let doc = discover(dir.path(), &DiscoveryConfig::default(), None, None).unwrap();

        assert_eq!(doc.status_of("src/linked.test.ts"), Some(FileStatus::Created));
    }

    #[test]
    fn limit_keeps_first_paths_in_order() {
        let dir = repo();
        let doc = discover(dir.path(), &DiscoveryConfig::default(), Some(1), None).unwrap();
        assert_eq!(doc.files.len(), 1);
        assert_eq!(doc.files[0].path, "src/client.test.ts");
    }

    #[test]
    fn directories_restrict_the_scan() {
        let dir = repo();
        write(dir.path(), "tests/other.test.ts", "it('x', () => {})");
        let config = DiscoveryConfig {
            directories: vec!["tests".into()],
            ..DiscoveryConfig::default()
        };
        let doc = discover(dir.path(), &config, None, None).unwrap();
        assert_eq!(doc.files.len(), 1);
        assert_eq!(doc.files[0].path, "tests/other.test.ts");
    }

    #[test]
    fn missing_repository_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = discover(&dir.path().join("nope"), &DiscoveryConfig::default(), None, None)
            .unwrap_err();
        assert!(matches!(err, PhaseError::Filesystem { .. }));
    }

    proptest! {
        #[test]
        fn any_single_byte_change_is_an_update(
            content in proptest::collection::vec(any::<u8>(), 1..256),
            index in any::<prop::sample::Index>(),
            flip in 1u8..=255,
        ) {
            let dir = TempDir::new().unwrap();
            let file = dir.path().join("a.test.ts");
            fs::write(&file, &content).unwrap();
            let first = discover(dir.path(), &DiscoveryConfig::default(), None, None).unwrap();

            let mut changed = content.clone();
            let i = index.index(changed.len());
            changed[i] ^= flip;
            fs::write(&file, &changed).unwrap();
            let second = discover(dir.path(), &DiscoveryConfig::default(), None, Some(&first)).unwrap();

            prop_assert_eq!(second.files[0].status, FileStatus::Updated);
            prop_assert_ne!(&second.files[0].fingerprint, &first.files[0].fingerprint);
        }
    }
}
