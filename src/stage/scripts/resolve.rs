//! Module graph: relative specifier resolution and dependency ordering.

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use crate::utils::fs::normalize_path;

use super::sourcemap::MapToken;

/// One module, transpiled, with its resolved dependencies.
#[derive(Debug)]
pub struct Module {
    pub path: PathBuf,
    /// Text as read from disk.
    pub source: String,
    pub code: String,
    /// `code` → `source` positions.
    pub tokens: Vec<MapToken>,
    /// Specifier as written → index into `ModuleGraph::modules`.
    pub deps: FxHashMap<String, usize>,
}

/// Modules in dependency order: every module comes after all of its
/// dependencies; the entry is last.
#[derive(Debug)]
pub struct ModuleGraph {
    pub modules: Vec<Module>,
}

/// What a [`ModuleLoader`] returns for one file.
#[derive(Debug, Default)]
pub struct Loaded {
    pub source: String,
    pub code: String,
    pub tokens: Vec<MapToken>,
    /// Import specifiers, as written.
    pub requests: Vec<String>,
}

pub trait ModuleLoader {
    fn load(&self, path: &Path) -> Result<Loaded, String>;
}

impl ModuleGraph {
    /// Walk the imports of `entry` depth-first (post-order).
    pub fn build(entry: &Path, loader: &impl ModuleLoader) -> Result<Self, String> {
        let mut walk = Walk {
            loader,
            modules: Vec::new(),
            done: FxHashMap::default(),
            stack: Vec::new(),
        };
        walk.visit(&normalize_path(entry))?;
        Ok(Self {
            modules: walk.modules,
        })
    }

    pub fn entry(&self) -> Option<&Module> {
        self.modules.last()
    }
}

struct Walk<'l, L> {
    loader: &'l L,
    modules: Vec<Module>,
    done: FxHashMap<PathBuf, usize>,
    /// Modules currently being visited, for cycle reporting.
    stack: Vec<PathBuf>,
}

impl<L: ModuleLoader> Walk<'_, L> {
    fn visit(&mut self, path: &Path) -> Result<usize, String> {
        if let Some(&id) = self.done.get(path) {
            return Ok(id);
        }
        if let Some(pos) = self.stack.iter().position(|p| p == path) {
            return Err(cycle_message(&self.stack[pos..], path));
        }

        self.stack.push(path.to_path_buf());
        let loaded = self.loader.load(path)?;

        let dir = path.parent().unwrap_or(Path::new("."));
        let mut deps = FxHashMap::default();
        for specifier in loaded.requests {
            if deps.contains_key(&specifier) {
                continue;
            }
            let resolved = resolve(dir, &specifier)
                .map_err(|e| format!("{}: {}", display_name(path), e))?;
            let id = self.visit(&resolved)?;
            deps.insert(specifier, id);
        }
        self.stack.pop();

        let id = self.modules.len();
        self.modules.push(Module {
            path: path.to_path_buf(),
            source: loaded.source,
            code: loaded.code,
            tokens: loaded.tokens,
            deps,
        });
        self.done.insert(path.to_path_buf(), id);
        Ok(id)
    }
}

fn cycle_message(chain: &[PathBuf], back_to: &Path) -> String {
    let names: Vec<_> = chain
        .iter()
        .map(|p| display_name(p))
        .chain(std::iter::once(display_name(back_to)))
        .collect();
    format!("circular import: {}", names.join(" -> "))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Resolve a relative specifier against `dir`.
///
/// Tries the exact path, then `.js`, `.mjs`, then `/index.js`.
pub fn resolve(dir: &Path, specifier: &str) -> Result<PathBuf, String> {
    if !(specifier.starts_with("./") || specifier.starts_with("../")) {
        return Err(format!(
            "cannot import `{specifier}`: only relative imports (./, ../) are bundled"
        ));
    }

    let base = dir.join(specifier);
    let candidates = [
        base.clone(),
        with_suffix(&base, ".js"),
        with_suffix(&base, ".mjs"),
        base.join("index.js"),
    ];
    candidates
        .into_iter()
        .find(|c| c.is_file())
        .map(|c| normalize_path(&c))
        .ok_or_else(|| format!("cannot resolve `{specifier}`"))
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(suffix);
    PathBuf::from(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Loader reading raw source; specifiers from `import ... from "x"` lines.
    struct LineLoader;

    impl ModuleLoader for LineLoader {
        fn load(&self, path: &Path) -> Result<Loaded, String> {
            let code = fs::read_to_string(path).map_err(|e| e.to_string())?;
            let requests = code
                .lines()
                .filter_map(|l| l.split('"').nth(1).filter(|_| l.starts_with("import")))
                .map(str::to_string)
                .collect();
            Ok(Loaded {
                source: code.clone(),
                code,
                tokens: Vec::new(),
                requests,
            })
        }
    }

    fn project(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        dir
    }

    fn names(graph: &ModuleGraph, root: &Path) -> Vec<String> {
        let root = normalize_path(root);
        graph
            .modules
            .iter()
            .map(|m| m.path.strip_prefix(&root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_post_order_entry_last() {
        let dir = project(&[
            ("main.js", "import \"./a\"\nimport \"./b.js\""),
            ("a.js", "import \"./shared\""),
            ("b.js", "import \"./shared.js\""),
            ("shared.js", "export const x = 1;"),
        ]);
        let graph = ModuleGraph::build(&dir.path().join("main.js"), &LineLoader).unwrap();
        assert_eq!(names(&graph, dir.path()), ["shared.js", "a.js", "b.js", "main.js"]);

        let a = &graph.modules[1];
        assert_eq!(a.deps.get("./shared"), Some(&0));
        assert_eq!(graph.entry().unwrap().deps.len(), 2);
    }

    #[test]
    fn test_resolution_order() {
        let dir = project(&[
            ("lib/index.js", ""),
            ("util.mjs", ""),
            ("exact", ""),
            ("exact.js", ""),
        ]);
        let root = dir.path();
        assert_eq!(
            resolve(root, "./lib").unwrap(),
            normalize_path(&root.join("lib/index.js"))
        );
        assert_eq!(
            resolve(root, "./util").unwrap(),
            normalize_path(&root.join("util.mjs"))
        );
        assert_eq!(
            resolve(root, "./exact").unwrap(),
            normalize_path(&root.join("exact"))
        );
    }

    #[test]
    fn test_bare_and_missing_specifiers_rejected() {
        let dir = project(&[]);
        let err = resolve(dir.path(), "lodash").unwrap_err();
        assert!(err.contains("lodash"));
        let err = resolve(dir.path(), "./nope").unwrap_err();
        assert!(err.contains("cannot resolve"));
    }

    #[test]
    fn test_cycle_detected() {
        let dir = project(&[
            ("main.js", "import \"./a\""),
            ("a.js", "import \"./b\""),
            ("b.js", "import \"./a\""),
        ]);
        let err = ModuleGraph::build(&dir.path().join("main.js"), &LineLoader).unwrap_err();
        assert_eq!(err, "circular import: a.js -> b.js -> a.js");
    }
}
