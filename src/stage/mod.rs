//! Stage processors.
//!
//! Each processor maps part of the source tree onto the output tree and
//! returns `Result<StageSummary, StageError>`. Processors never report: the
//! pipeline driver and the watch dispatcher hand failures to the reporter.
//!
//! | Stage             | Input              | Output                    |
//! |-------------------|--------------------|---------------------------|
//! | `clean`           | -                  | removes `dist/`           |
//! | `copy-assets`     | `src/assets/**`    | `dist/assets/**`          |
//! | `compile-styles`  | `src/scss/**.scss` | `dist/css/*.min.css`      |
//! | `optimize-images` | `src/images/**`    | `dist/images/**`          |
//! | `build-scripts`   | `src/js/scripts.js`| `dist/js/scripts.min.js`  |
//! | `minify-markup`   | `src/html/**.html` | `dist/**.html`            |

mod assets;
mod clean;
mod images;
mod markup;
mod scripts;
mod styles;

use crate::config::ProjectConfig;
use crate::core::{Layout, StageError, StageId, StageSummary};

/// Receives output changes a stage wants streamed to browsers.
///
/// Implemented by the live-reload channel while serving.
pub trait ChangePublisher: Send + Sync {
    /// Stylesheets were rewritten; `paths` are URL paths such as `/css/main.min.css`.
    fn css_changed(&self, paths: Vec<String>);
}

/// Everything a stage run needs.
pub struct BuildContext<'a> {
    pub config: &'a ProjectConfig,
    pub layout: Layout,
    publisher: Option<&'a dyn ChangePublisher>,
    progress: bool,
}

impl<'a> BuildContext<'a> {
    pub fn new(config: &'a ProjectConfig) -> Self {
        Self {
            config,
            layout: config.layout(),
            publisher: None,
            progress: false,
        }
    }

    /// Show progress counters for long stages (full runs only).
    pub fn with_progress(mut self) -> Self {
        self.progress = true;
        self
    }

    pub fn with_publisher(mut self, publisher: &'a dyn ChangePublisher) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub(crate) fn publisher(&self) -> Option<&'a dyn ChangePublisher> {
        self.publisher
    }

    pub(crate) fn show_progress(&self) -> bool {
        self.progress && !crate::logger::is_verbose()
    }
}

/// Run one stage.
pub fn run_stage(stage: StageId, ctx: &BuildContext<'_>) -> Result<StageSummary, StageError> {
    match stage {
        StageId::Clean => clean::run(ctx),
        StageId::Assets => assets::run(ctx),
        StageId::Styles => styles::run(ctx),
        StageId::Images => images::run(ctx),
        StageId::Scripts => scripts::run(ctx),
        StageId::Markup => markup::run(ctx),
        StageId::Serve => Err(StageError::failed(
            StageId::Serve,
            "serve is not a build stage",
        )),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fixture project helpers shared by stage and pipeline tests.

    use std::fs;
    use std::path::{Path, PathBuf};

    use parking_lot::Mutex;
    use tempfile::TempDir;

    use super::ChangePublisher;
    use crate::config::ProjectConfig;

    pub struct Fixture {
        pub dir: TempDir,
        pub config: ProjectConfig,
    }

    impl Fixture {
        pub fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let root = dir.path().canonicalize().unwrap();
            Self {
                dir,
                config: ProjectConfig::with_root(root),
            }
        }

        pub fn root(&self) -> &Path {
            self.config.root()
        }

        /// Write a file relative to the project root.
        pub fn write(&self, rel: &str, contents: impl AsRef<[u8]>) -> PathBuf {
            let path = self.root().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, contents).unwrap();
            path
        }

        pub fn read(&self, rel: &str) -> String {
            fs::read_to_string(self.root().join(rel)).unwrap()
        }

        pub fn exists(&self, rel: &str) -> bool {
            self.root().join(rel).exists()
        }

        /// Every file under `dist/`, relative to it, sorted.
        pub fn output_files(&self) -> Vec<String> {
            let dist = self.root().join("dist");
            crate::utils::fs::collect_files(&dist)
                .into_iter()
                .map(|p| p.strip_prefix(&dist).unwrap().to_string_lossy().replace('\\', "/"))
                .collect()
        }
    }

    /// Publisher that records what it was sent.
    #[derive(Default)]
    pub struct RecordingPublisher {
        pub css: Mutex<Vec<Vec<String>>>,
    }

    impl ChangePublisher for RecordingPublisher {
        fn css_changed(&self, paths: Vec<String>) {
            self.css.lock().push(paths);
        }
    }
}
