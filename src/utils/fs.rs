//! Filesystem helpers shared by the stages and the watcher.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use jwalk::WalkDir;

/// OS metadata files never treated as inputs.
const IGNORED_FILES: &[&str] = &[".DS_Store", "Thumbs.db", "desktop.ini"];

/// Normalize a path to absolute form.
///
/// Tries `canonicalize()` first, falling back to joining with the current
/// directory when the path does not exist yet.
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// Collect all files under `dir`, recursively, sorted by path.
///
/// A missing directory yields an empty list.
pub fn collect_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .sort(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_str().unwrap_or_default();
            !IGNORED_FILES.contains(&name)
        })
        .map(|e| e.path())
        .collect();
    files.sort();
    files
}

/// Collect files under `dir` whose extension matches one of `exts`
/// (case-insensitive).
pub fn collect_files_with_ext(dir: &Path, exts: &[&str]) -> Vec<PathBuf> {
    collect_files(dir)
        .into_iter()
        .filter(|p| has_extension(p, exts))
        .collect()
}

pub fn has_extension(path: &Path, exts: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| exts.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

/// Map `path` under `from` to the same relative path under `to`.
pub fn mirror_path(path: &Path, from: &Path, to: &Path) -> Option<PathBuf> {
    path.strip_prefix(from).ok().map(|rel| to.join(rel))
}

pub fn get_mtime(path: &Path) -> Option<SystemTime> {
    path.metadata().and_then(|m| m.modified()).ok()
}

/// `true` when `output` exists and `source` is not newer than it.
pub fn is_output_fresh(source: &Path, output: &Path) -> bool {
    let Some(output_time) = get_mtime(output) else {
        return false;
    };
    match get_mtime(source) {
        Some(source_time) => source_time <= output_time,
        None => false,
    }
}

/// Write `contents`, creating parent directories as needed.
pub fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)
}

/// Editor temp/backup artifacts.
pub fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "swx" | "tmp")
        || name.ends_with('~')
        || name.starts_with(".#")
        || name.starts_with('.')
        || IGNORED_FILES.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_collect_files_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("b")).unwrap();
        fs::write(dir.path().join("b/z.txt"), "z").unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join(".DS_Store"), "").unwrap();

        let files = collect_files(dir.path());
        assert_eq!(
            files,
            vec![dir.path().join("a.txt"), dir.path().join("b/z.txt")]
        );
    }

    #[test]
    fn test_collect_files_missing_dir() {
        assert!(collect_files(Path::new("/nonexistent/kiln/dir")).is_empty());
    }

    #[test]
    fn test_collect_files_with_ext_case_insensitive() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.PNG"), "").unwrap();
        fs::write(dir.path().join("b.jpg"), "").unwrap();
        fs::write(dir.path().join("c.svg"), "").unwrap();

        let files = collect_files_with_ext(dir.path(), &["png", "jpg"]);
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_mirror_path() {
        let mirrored = mirror_path(
            Path::new("/site/src/assets/fonts/a.woff"),
            Path::new("/site/src/assets"),
            Path::new("/site/dist/assets"),
        );
        assert_eq!(mirrored, Some(PathBuf::from("/site/dist/assets/fonts/a.woff")));
        assert_eq!(
            mirror_path(Path::new("/other"), Path::new("/site"), Path::new("/x")),
            None
        );
    }

    #[test]
    fn test_is_output_fresh() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.png");
        let out = dir.path().join("out.png");
        fs::write(&src, "s").unwrap();
        assert!(!is_output_fresh(&src, &out));

        fs::write(&out, "o").unwrap();
        let old = SystemTime::now() - Duration::from_secs(60);
        fs::File::options()
            .write(true)
            .open(&src)
            .unwrap()
            .set_modified(old)
            .unwrap();
        assert!(is_output_fresh(&src, &out));
    }

    #[test]
    fn test_write_file_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/c.txt");
        write_file(&path, "x").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "x");
    }

    #[test]
    fn test_temp_files() {
        assert!(is_temp_file(Path::new("/x/main.scss~")));
        assert!(is_temp_file(Path::new("/x/.main.scss.swp")));
        assert!(is_temp_file(Path::new("/x/4913.tmp")));
        assert!(!is_temp_file(Path::new("/x/main.scss")));
    }
}
