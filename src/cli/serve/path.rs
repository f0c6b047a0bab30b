//! URL to filesystem path resolution.

use std::path::{Path, PathBuf};

/// Resolve a request URL to a file under `serve_root`.
///
/// `/` and directories map to `index.html`; extensionless paths fall back to
/// `<path>.html`. Anything escaping the root is rejected.
pub fn resolve_path(url: &str, serve_root: &Path) -> Option<PathBuf> {
    let clean = normalize_url(url);
    if clean.split('/').any(|segment| segment == "..") {
        return None;
    }

    let root = serve_root.canonicalize().ok()?;
    let local = root.join(&clean);

    let candidates = [
        Some(local.clone()),
        Some(local.join("index.html")),
        (!clean.is_empty() && local.extension().is_none()).then(|| local.with_extension("html")),
    ];

    candidates.into_iter().flatten().find_map(|candidate| {
        // Canonicalize to follow symlinks, then check containment
        let canonical = candidate.canonicalize().ok()?;
        (canonical.starts_with(&root) && canonical.is_file()).then_some(canonical)
    })
}

/// Decode, strip query string and fragment, trim slashes.
fn normalize_url(url: &str) -> String {
    use percent_encoding::percent_decode_str;

    let path = url.split(['?', '#']).next().unwrap_or(url);
    let decoded = percent_decode_str(path)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_default();
    decoded.trim_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn site() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("blog")).unwrap();
        fs::create_dir_all(dir.path().join("css")).unwrap();
        fs::write(dir.path().join("index.html"), "home").unwrap();
        fs::write(dir.path().join("about.html"), "about").unwrap();
        fs::write(dir.path().join("blog/index.html"), "blog").unwrap();
        fs::write(dir.path().join("css/main.min.css"), "").unwrap();
        fs::write(dir.path().join("my file.txt"), "").unwrap();
        dir
    }

    fn resolved(dir: &TempDir, url: &str) -> Option<String> {
        let root = dir.path().canonicalize().unwrap();
        resolve_path(url, dir.path()).map(|p| {
            p.strip_prefix(&root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
    }

    #[test]
    fn test_resolve_files_and_indexes() {
        let dir = site();
        assert_eq!(resolved(&dir, "/").as_deref(), Some("index.html"));
        assert_eq!(resolved(&dir, "/blog/").as_deref(), Some("blog/index.html"));
        assert_eq!(resolved(&dir, "/blog").as_deref(), Some("blog/index.html"));
        assert_eq!(resolved(&dir, "/about").as_deref(), Some("about.html"));
        assert_eq!(
            resolved(&dir, "/css/main.min.css?v=2").as_deref(),
            Some("css/main.min.css")
        );
        assert_eq!(resolved(&dir, "/my%20file.txt").as_deref(), Some("my file.txt"));
    }

    #[test]
    fn test_resolve_rejects_missing_and_traversal() {
        let dir = site();
        assert_eq!(resolved(&dir, "/nope.html"), None);
        assert_eq!(resolved(&dir, "/css"), None);
        assert_eq!(resolved(&dir, "/../etc/passwd"), None);
        assert_eq!(resolved(&dir, "/%2e%2e/secret"), None);
    }
}
