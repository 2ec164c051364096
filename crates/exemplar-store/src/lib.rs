//! Flat-file JSON document store.
//!
//! Documents live as `<dir>/<NN-phase>.json`. Upstream documents are read
//! from the input directory; every write, and the lookup of a phase's own
//! previous document, targets the output directory.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io::ErrorKind;
use tracing::{debug, warn};

use exemplar_model::PhaseDocument;
use exemplar_utils::atomic_write::write_file_atomic;
use exemplar_utils::error::{ExemplarError, PhaseError, StoreError};
use exemplar_utils::types::PhaseId;

#[derive(Debug, Clone)]
pub struct DocumentStore {
    input_dir: Utf8PathBuf,
    output_dir: Utf8PathBuf,
}

impl DocumentStore {
    #[must_use]
    pub fn new(input_dir: impl Into<Utf8PathBuf>, output_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Store that reads and writes the same directory.
    #[must_use]
    pub fn in_dir(dir: impl Into<Utf8PathBuf>) -> Self {
        let dir = dir.into();
        Self::new(dir.clone(), dir)
    }

    #[must_use]
    pub fn input_dir(&self) -> &Utf8Path {
        &self.input_dir
    }

    #[must_use]
    pub fn output_dir(&self) -> &Utf8Path {
        &self.output_dir
    }

    #[must_use]
    pub fn document_path(dir: &Utf8Path, name: &str) -> Utf8PathBuf {
        dir.join(format!("{name}.json"))
    }

    /// Overwrite the document in the output directory.
    pub fn write<D: PhaseDocument>(&self, document: &D) -> Result<Utf8PathBuf, StoreError> {
        let name = D::document_name();
        let path = Self::document_path(&self.output_dir, &name);

        let json = serde_json::to_string_pretty(document).map_err(|e| StoreError::Write {
            document: name.clone(),
            path: path.to_string(),
            reason: e.to_string(),
        })?;

        write_file_atomic(&path, &json).map_err(|e| StoreError::Write {
            document: name.clone(),
            path: path.to_string(),
            reason: format!("{e:#}"),
        })?;

        debug!(document = %name, path = %path, "Wrote document");
        Ok(path)
    }

    /// Read an upstream document `requester` cannot run without.
    ///
    /// Absence is a [`PhaseError::MissingInput`] naming the producing phase.
    pub fn read_required<D: PhaseDocument>(&self, requester: PhaseId) -> Result<D, ExemplarError> {
        let name = D::document_name();
        let path = Self::document_path(&self.input_dir, &name);

        match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                StoreError::Parse {
                    document: name,
                    path: path.to_string(),
                    reason: e.to_string(),
                }
                .into()
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(PhaseError::MissingInput {
                phase: requester,
                document: name,
                producer: D::PHASE,
            }
            .into()),
            Err(e) => Err(StoreError::Read {
                document: name,
                path: path.to_string(),
                reason: e.to_string(),
            }
            .into()),
        }
    }

    /// Read an upstream document that may legitimately not exist yet.
    #[must_use]
    pub fn read_optional<D: PhaseDocument>(&self) -> Option<D> {
        Self::read_tolerant(&self.input_dir)
    }

    /// Read this phase's own document from the previous run.
    ///
    /// A missing, unreadable or corrupt document means "no prior state".
    #[must_use]
    pub fn read_previous<D: PhaseDocument>(&self) -> Option<D> {
        Self::read_tolerant(&self.output_dir)
    }

    fn read_tolerant<D: PhaseDocument>(dir: &Utf8Path) -> Option<D> {
        let name = D::document_name();
        let path = Self::document_path(dir, &name);

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(document = %name, path = %path, error = %e, "Ignoring unreadable document");
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(document) => Some(document),
            Err(e) => {
                warn!(document = %name, path = %path, error = %e, "Ignoring corrupt document");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use exemplar_model::{DiscoveryDocument, DiscoverySummary, ExtractionDocument};
    use tempfile::TempDir;

    fn utf8(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
    }

    fn discovery() -> DiscoveryDocument {
        DiscoveryDocument {
            schema_version: 1,
            generated_at: Utc::now(),
            repository: "/repo".into(),
            files: vec![],
            summary: DiscoverySummary::default(),
        }
    }

    #[test]
    fn write_then_read_required() {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::in_dir(utf8(&dir));

        let path = store.write(&discovery()).unwrap();
        assert!(path.as_str().ends_with("01-discovery.json"));

        let back: DiscoveryDocument = store.read_required(PhaseId::Extraction).unwrap();
        assert_eq!(back.repository, "/repo");
    }

    #[test]
    fn missing_required_names_producer() {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::in_dir(utf8(&dir));

        let err = store
            .read_required::<ExtractionDocument>(PhaseId::Distillation)
            .unwrap_err();

        match err {
            ExemplarError::Phase(PhaseError::MissingInput {
                phase,
                document,
                producer,
            }) => {
                assert_eq!(phase, PhaseId::Distillation);
                assert_eq!(document, "02-extraction");
                assert_eq!(producer, PhaseId::Extraction);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn corrupt_required_is_parse_error_but_optional_is_absent() {
        let dir = TempDir::new().unwrap();
        let root = utf8(&dir);
        fs::write(root.join("01-discovery.json"), "{\"schema_version\": 1, \"gen").unwrap();
        let store = DocumentStore::in_dir(root);

        let err = store
            .read_required::<DiscoveryDocument>(PhaseId::Extraction)
            .unwrap_err();
        assert!(matches!(err, ExemplarError::Store(StoreError::Parse { .. })));

        assert!(store.read_optional::<DiscoveryDocument>().is_none());
        assert!(store.read_previous::<DiscoveryDocument>().is_none());
    }

    #[test]
    fn previous_reads_output_and_optional_reads_input() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let store = DocumentStore::new(utf8(&input), utf8(&output));

        store.write(&discovery()).unwrap();

        assert!(store.read_previous::<DiscoveryDocument>().is_some());
        assert!(store.read_optional::<DiscoveryDocument>().is_none());
    }
}
