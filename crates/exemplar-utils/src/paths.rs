use std::path::Path;

/// mkdir -p; treat `AlreadyExists` as success (removes TOCTTOU races)
pub fn ensure_dir_all<P: AsRef<Path>>(p: P) -> std::io::Result<()> {
    match std::fs::create_dir_all(&p) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e),
    }
}

/// Repo-relative path with forward slashes, the join key across documents.
///
/// Returns `None` when `path` does not live under `root`.
#[must_use]
pub fn repo_relative(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Turn a free-form title into a lowercase, hyphen-separated slug.
///
/// Runs of non-alphanumeric characters collapse into a single hyphen and
/// leading/trailing hyphens are dropped. An empty result becomes `example`.
#[must_use]
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        "example".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn ensure_dir_all_is_idempotent() {
        let dir = tempfile::TempDir::new().unwrap();
        let nested = dir.path().join("x/y");
        ensure_dir_all(&nested).unwrap();
        ensure_dir_all(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn repo_relative_uses_forward_slashes() {
        let root = PathBuf::from("/repo");
        let file = root.join("tests").join("unit").join("a.test.ts");
        assert_eq!(
            repo_relative(&root, &file).as_deref(),
            Some("tests/unit/a.test.ts")
        );
        assert_eq!(repo_relative(&root, Path::new("/elsewhere/a.ts")), None);
        assert_eq!(repo_relative(&root, &root), None);
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Create a Client!"), "create-a-client");
        assert_eq!(slugify("  --Stream  events__now "), "stream-events-now");
        assert_eq!(slugify("Ünïcode"), "n-code");
        assert_eq!(slugify("???"), "example");
    }
}
