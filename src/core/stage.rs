//! Stage identity, results and errors.
//!
//! Every processor returns `Result<StageSummary, StageError>`:
//!
//! - `Ok(summary)` - the stage ran; `summary.failures` lists per-file problems
//!   that were skipped over (best-effort stages).
//! - `Err(StageError)` - the stage halted; nothing more was written by it.
//!
//! Neither the processors nor this module print anything. Reporting happens at
//! the boundary (pipeline driver, watch dispatcher) through `pipeline::report`.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// One named processing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageId {
    Clean,
    Assets,
    Styles,
    Images,
    Scripts,
    Markup,
    Serve,
}

impl StageId {
    /// Task name, as used on the command line and in notifications.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Assets => "copy-assets",
            Self::Styles => "compile-styles",
            Self::Images => "optimize-images",
            Self::Scripts => "build-scripts",
            Self::Markup => "minify-markup",
            Self::Serve => "serve",
        }
    }

    /// Short label for progress counters.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Assets => "assets",
            Self::Styles => "styles",
            Self::Images => "images",
            Self::Scripts => "scripts",
            Self::Markup => "markup",
            Self::Serve => "serve",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A user-visible failure, surfaced by the reporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub stage: StageId,
    pub message: String,
    pub path: Option<PathBuf>,
}

impl Failure {
    pub fn new(stage: StageId, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            path: None,
        }
    }

    pub fn at(stage: StageId, path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            path: Some(path.into()),
        }
    }

    /// Notification title: `error in <task>`.
    pub fn title(&self) -> String {
        format!("error in {}", self.stage)
    }

    /// Notification body: message, prefixed by the file when known.
    pub fn body(&self) -> String {
        match &self.path {
            Some(path) => format!("{}: {}", path.display(), self.message),
            None => self.message.clone(),
        }
    }
}

/// Halting stage error.
#[derive(Debug, Error)]
pub enum StageError {
    /// Compile / transform failure inside a stage.
    #[error("{stage} failed: {message}")]
    Failed { stage: StageId, message: String },

    /// Filesystem failure that prevents the stage from continuing.
    #[error("{stage}: I/O error at `{}`", path.display())]
    Io {
        stage: StageId,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StageError {
    pub fn failed(stage: StageId, message: impl Into<String>) -> Self {
        Self::Failed {
            stage,
            message: message.into(),
        }
    }

    pub fn io(stage: StageId, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            stage,
            path: path.into(),
            source,
        }
    }

    pub fn stage(&self) -> StageId {
        match self {
            Self::Failed { stage, .. } | Self::Io { stage, .. } => *stage,
        }
    }

    /// Convert into the reporter's failure shape.
    pub fn to_failure(&self) -> Failure {
        match self {
            Self::Failed { stage, message } => Failure::new(*stage, message.clone()),
            Self::Io {
                stage,
                path,
                source,
            } => Failure::at(*stage, path.clone(), source.to_string()),
        }
    }
}

/// Attach the stage and path to an I/O result.
pub trait IoContext<T> {
    fn at_path(self, stage: StageId, path: &Path) -> Result<T, StageError>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn at_path(self, stage: StageId, path: &Path) -> Result<T, StageError> {
        self.map_err(|e| StageError::io(stage, path, e))
    }
}

/// Outcome of a stage run that did not halt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSummary {
    pub stage: StageId,
    /// Output files written by this run.
    pub written: Vec<PathBuf>,
    /// Inputs skipped because their output was up to date.
    pub skipped: usize,
    /// Best-effort failures that did not abort the stage.
    pub failures: Vec<Failure>,
}

impl StageSummary {
    pub fn new(stage: StageId) -> Self {
        Self {
            stage,
            written: Vec::new(),
            skipped: 0,
            failures: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// One-line description for the log.
    pub fn describe(&self) -> String {
        let mut parts = vec![format!("{} written", self.written.len())];
        if self.skipped > 0 {
            parts.push(format!("{} up to date", self.skipped));
        }
        if !self.failures.is_empty() {
            let n = self.failures.len();
            parts.push(format!("{} failed", n));
        }
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_names() {
        assert_eq!(StageId::Clean.name(), "clean");
        assert_eq!(StageId::Assets.name(), "copy-assets");
        assert_eq!(StageId::Styles.name(), "compile-styles");
        assert_eq!(StageId::Images.name(), "optimize-images");
        assert_eq!(StageId::Scripts.name(), "build-scripts");
        assert_eq!(StageId::Markup.name(), "minify-markup");
    }

    #[test]
    fn test_failure_title_names_stage() {
        let failure = Failure::new(StageId::Styles, "expected \"}\"");
        assert_eq!(failure.title(), "error in compile-styles");
        assert_eq!(failure.body(), "expected \"}\"");
    }

    #[test]
    fn test_failure_body_with_path() {
        let failure = Failure::at(StageId::Images, "src/images/a.png", "bad header");
        assert_eq!(failure.body(), "src/images/a.png: bad header");
    }

    #[test]
    fn test_stage_error_to_failure() {
        let err = StageError::failed(StageId::Scripts, "unexpected token");
        assert_eq!(err.stage(), StageId::Scripts);
        let failure = err.to_failure();
        assert_eq!(failure.stage, StageId::Scripts);
        assert_eq!(failure.message, "unexpected token");
        assert!(failure.path.is_none());

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = StageError::io(StageId::Clean, "dist", io);
        let failure = err.to_failure();
        assert_eq!(failure.path, Some(PathBuf::from("dist")));
        assert!(err.to_string().contains("clean"));
    }

    #[test]
    fn test_summary_describe() {
        let mut summary = StageSummary::new(StageId::Images);
        summary.written.push(PathBuf::from("a.png"));
        summary.skipped = 2;
        assert_eq!(summary.describe(), "1 written, 2 up to date");
        summary
            .failures
            .push(Failure::new(StageId::Images, "decode error"));
        assert!(!summary.is_clean());
        assert_eq!(summary.describe(), "1 written, 2 up to date, 1 failed");
    }
}
