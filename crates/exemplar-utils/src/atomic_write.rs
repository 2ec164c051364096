//! Atomic file writes.
//!
//! Content goes to a temporary file in the target directory, is fsynced,
//! then renamed over the target. Readers observe either the old file or the
//! new one, never a truncated write.

use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;
use std::io::Write;

use tempfile::NamedTempFile;

/// Write UTF-8 text atomically, normalising line endings to LF.
///
/// Parent directories are created as needed.
pub fn write_file_atomic(path: &Utf8Path, content: &str) -> Result<()> {
    write_bytes_atomic(path, normalize_line_endings(content).as_bytes())
}

/// Write raw bytes atomically. Used for verbatim copies.
pub fn write_bytes_atomic(path: &Utf8Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_str().is_empty() => p,
        _ => Utf8Path::new("."),
    };
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create parent directory: {parent}"))?;

    let mut temp_file = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temporary file in: {parent}"))?;

    temp_file
        .write_all(bytes)
        .context("Failed to write content to temporary file")?;
    temp_file
        .as_file()
        .sync_all()
        .context("Failed to fsync temporary file")?;

    temp_file
        .persist(path.as_std_path())
        .map_err(|e| anyhow::anyhow!(e.error))
        .with_context(|| format!("Failed to atomically write file: {path}"))?;

    Ok(())
}

fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n").replace('\r', "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    fn utf8(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let target = utf8(&dir).join("a/b/c.json");

        write_file_atomic(&target, "{}").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "{}");
    }

    #[test]
    fn overwrites_whole_file() {
        let dir = TempDir::new().unwrap();
        let target = utf8(&dir).join("doc.json");

        write_file_atomic(&target, "a much longer first version").unwrap();
        write_file_atomic(&target, "short").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "short");
    }

    #[test]
    fn normalizes_crlf() {
        let dir = TempDir::new().unwrap();
        let target = utf8(&dir).join("README.md");

        write_file_atomic(&target, "line1\r\nline2\rline3\n").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "line1\nline2\nline3\n");
    }

    #[test]
    fn bytes_are_written_verbatim() {
        let dir = TempDir::new().unwrap();
        let target = utf8(&dir).join("artifact.bin");
        let payload = [0u8, 13, 10, 255];

        write_bytes_atomic(&target, &payload).unwrap();

        assert_eq!(fs::read(&target).unwrap(), payload);
    }

    #[test]
    fn leaves_no_temp_files_behind() {
        let dir = TempDir::new().unwrap();
        let target = utf8(&dir).join("only.txt");

        write_file_atomic(&target, "x").unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
