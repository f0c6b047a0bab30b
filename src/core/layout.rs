//! Fixed project directory layout.
//!
//! ```text
//! <root>/
//! ├── src/
//! │   ├── assets/**        → dist/assets/**
//! │   ├── images/**        → dist/images/**
//! │   ├── scss/**/*.scss   → dist/css/*.min.css (+ .map)
//! │   ├── js/scripts.js    → dist/js/scripts.min.js (+ .map)
//! │   └── html/**/*.html   → dist/**/*.html
//! └── dist/
//! ```

use std::path::{Path, PathBuf};

use super::StageId;

const SOURCE_DIR: &str = "src";
const OUTPUT_DIR: &str = "dist";

/// Script bundle entry, relative to the scripts source directory.
pub const SCRIPT_ENTRY: &str = "scripts.js";
/// Script bundle output name.
pub const SCRIPT_OUTPUT: &str = "scripts.min.js";
/// Suffix inserted before the extension of minified outputs.
pub const MIN_SUFFIX: &str = ".min";

/// Source and output paths of a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn source_dir(&self) -> PathBuf {
        self.root.join(SOURCE_DIR)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(OUTPUT_DIR)
    }

    pub fn assets_src(&self) -> PathBuf {
        self.source_dir().join("assets")
    }

    pub fn assets_out(&self) -> PathBuf {
        self.output_dir().join("assets")
    }

    pub fn images_src(&self) -> PathBuf {
        self.source_dir().join("images")
    }

    pub fn images_out(&self) -> PathBuf {
        self.output_dir().join("images")
    }

    pub fn styles_src(&self) -> PathBuf {
        self.source_dir().join("scss")
    }

    pub fn styles_out(&self) -> PathBuf {
        self.output_dir().join("css")
    }

    pub fn scripts_src(&self) -> PathBuf {
        self.source_dir().join("js")
    }

    pub fn script_entry(&self) -> PathBuf {
        self.scripts_src().join(SCRIPT_ENTRY)
    }

    pub fn scripts_out(&self) -> PathBuf {
        self.output_dir().join("js")
    }

    pub fn markup_src(&self) -> PathBuf {
        self.source_dir().join("html")
    }

    /// Markup lands directly in the output root.
    pub fn markup_out(&self) -> PathBuf {
        self.output_dir()
    }

    /// Source subtree watched for a stage, if the stage has one.
    pub fn watched_source(&self, stage: StageId) -> Option<PathBuf> {
        match stage {
            StageId::Assets => Some(self.assets_src()),
            StageId::Images => Some(self.images_src()),
            StageId::Styles => Some(self.styles_src()),
            StageId::Scripts => Some(self.scripts_src()),
            StageId::Markup => Some(self.markup_src()),
            StageId::Clean | StageId::Serve => None,
        }
    }

    /// Path relative to the project root, for display.
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}

/// Insert `.min` before the extension: `main.css` → `main.min.css`.
pub fn minified_name(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}{MIN_SUFFIX}.{ext}"),
        _ => format!("{file_name}{MIN_SUFFIX}"),
    }
}
