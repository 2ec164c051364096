//! Resolution of an example's `artifacts_plan` into `artifacts/`.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::path::{Component, Path};
use tracing::{debug, warn};

use exemplar_model::{ArtifactAction, ArtifactPlan};
use exemplar_utils::atomic_write::{write_bytes_atomic, write_file_atomic};

/// Subdirectory of an example that holds its artifacts.
pub const ARTIFACTS_DIR: &str = "artifacts";

/// Copy or synthesize every planned artifact under `example_dir/artifacts`.
///
/// Returns the written paths relative to `example_dir`. Problems with a
/// single artifact become notes; they never fail the example.
pub fn resolve(
    repo_root: &Path,
    example_dir: &Utf8Path,
    plans: &[ArtifactPlan],
    notes: &mut Vec<String>,
) -> Vec<String> {
    let mut written = Vec::new();
    for artifact in plans {
        let Some(relative) = contained(&artifact.path) else {
            warn!(path = %artifact.path, "Refusing artifact path outside the example directory");
            notes.push(format!("artifact '{}' skipped: path escapes the artifacts directory", artifact.path));
            continue;
        };
        let target = example_dir.join(ARTIFACTS_DIR).join(&relative);

        let result = match artifact.action {
            ArtifactAction::Copy => copy(repo_root, artifact, &target, notes),
            ArtifactAction::Generate => write_file_atomic(&target, &stub_for(artifact))
                .map(|()| true)
                .map_err(|e| format!("{e:#}")),
        };

        match result {
            Ok(true) => {
                debug!(artifact = %relative, action = ?artifact.action, "Wrote artifact");
                written.push(format!("{ARTIFACTS_DIR}/{relative}"));
            }
            Ok(false) => {}
            Err(e) => {
                warn!(artifact = %relative, error = %e, "Failed to write artifact");
                notes.push(format!("artifact '{relative}' failed: {e}"));
            }
        }
    }
    written
}

/// `Ok(false)` when the source is missing and the artifact was skipped.
fn copy(
    repo_root: &Path,
    artifact: &ArtifactPlan,
    target: &Utf8Path,
    notes: &mut Vec<String>,
) -> Result<bool, String> {
    let source = artifact.source_path.as_deref().unwrap_or(&artifact.path);
    if contained(source).is_none() {
        notes.push(format!("artifact '{}' skipped: source '{source}' is outside the repository", artifact.path));
        return Ok(false);
    }
    let source_path = repo_root.join(source);
    match fs::read(&source_path) {
        Ok(bytes) => write_bytes_atomic(target, &bytes)
            .map(|()| true)
            .map_err(|e| format!("{e:#}")),
        Err(e) => {
            warn!(artifact = %artifact.path, source = %source, error = %e, "Artifact source missing; skipping");
            notes.push(format!("artifact '{}' skipped: source '{source}' not found", artifact.path));
            Ok(false)
        }
    }
}

/// Normalized relative path, or `None` if it is absolute or climbs out.
fn contained(path: &str) -> Option<Utf8PathBuf> {
    let mut normalized = Utf8PathBuf::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => normalized.push(part.to_str()?),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (!normalized.as_str().is_empty()).then_some(normalized)
}

/// Minimal valid placeholder for an artifact of the declared type.
#[must_use]
pub fn stub_for(artifact: &ArtifactPlan) -> String {
    let extension = Path::new(&artifact.path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let by_extension = match extension.as_deref() {
        Some("json") => Some("{}\n".to_string()),
        Some("yaml" | "yml") => Some("{}\n".to_string()),
        Some("toml") => Some(format!("# {}\n", artifact.description)),
        Some("ts" | "js" | "mjs" | "cjs") => Some("export {};\n".to_string()),
        Some("py") => Some("pass\n".to_string()),
        Some("rs") => Some("fn main() {}\n".to_string()),
        Some("sh") => Some("#!/bin/sh\nexit 0\n".to_string()),
        _ => None,
    };
    if let Some(stub) = by_extension {
        return stub;
    }

    match artifact.artifact_type.to_ascii_lowercase().as_str() {
        "json" | "config" => "{}\n".to_string(),
        "code" | "script" | "program" => "// placeholder\n".to_string(),
        _ => format!("Placeholder: {}\n", artifact.description),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn artifact(path: &str, kind: &str, action: ArtifactAction, source: Option<&str>) -> ArtifactPlan {
        ArtifactPlan {
            path: path.into(),
            artifact_type: kind.into(),
            action,
            source_path: source.map(Into::into),
            description: "sample data".into(),
        }
    }

    fn dirs() -> (TempDir, TempDir, Utf8PathBuf) {
        let repo = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let example = Utf8PathBuf::from_path_buf(out.path().join("01-demo")).unwrap();
        (repo, out, example)
    }

    #[test]
    fn copies_existing_sources_verbatim() {
        let (repo, _out, example) = dirs();
        fs::create_dir_all(repo.path().join("fixtures")).unwrap();
        fs::write(repo.path().join("fixtures/data.csv"), b"a,b\n1,2\n").unwrap();
        let mut notes = Vec::new();

        let written = resolve(
            repo.path(),
            &example,
            &[artifact("data.csv", "data", ArtifactAction::Copy, Some("fixtures/data.csv"))],
            &mut notes,
        );

        assert_eq!(written, vec!["artifacts/data.csv"]);
        assert_eq!(fs::read(example.join("artifacts/data.csv")).unwrap(), b"a,b\n1,2\n");
        assert!(notes.is_empty());
    }

    #[test]
    fn missing_copy_source_is_skipped_with_a_note() {
        let (repo, _out, example) = dirs();
        let mut notes = Vec::new();

        let written = resolve(
            repo.path(),
            &example,
            &[artifact("data.csv", "data", ArtifactAction::Copy, Some("nope.csv"))],
            &mut notes,
        );

        assert!(written.is_empty());
        assert_eq!(notes.len(), 1);
        assert!(notes[0].contains("not found"));
    }

    #[test]
    fn generated_stubs_match_type() {
        let (repo, _out, example) = dirs();
        let mut notes = Vec::new();

        let written = resolve(
            repo.path(),
            &example,
            &[
                artifact("settings.json", "config", ArtifactAction::Generate, None),
                artifact("helper.ts", "code", ArtifactAction::Generate, None),
                artifact("notes.txt", "doc", ArtifactAction::Generate, None),
            ],
            &mut notes,
        );

        assert_eq!(written.len(), 3);
        let json = fs::read_to_string(example.join("artifacts/settings.json")).unwrap();
        assert!(serde_json::from_str::<serde_json::Value>(&json).is_ok());
        assert_eq!(
            fs::read_to_string(example.join("artifacts/helper.ts")).unwrap(),
            "export {};\n"
        );
        assert!(
            fs::read_to_string(example.join("artifacts/notes.txt"))
                .unwrap()
                .contains("sample data")
        );
    }

    #[test]
    fn escaping_paths_are_rejected() {
        let (repo, _out, example) = dirs();
        let mut notes = Vec::new();

        let written = resolve(
            repo.path(),
            &example,
            &[
                artifact("../evil.txt", "doc", ArtifactAction::Generate, None),
                artifact("/etc/passwd", "doc", ArtifactAction::Generate, None),
                artifact("ok.txt", "doc", ArtifactAction::Copy, Some("../../secret")),
            ],
            &mut notes,
        );

        assert!(written.is_empty());
        assert_eq!(notes.len(), 3);
    }
}
