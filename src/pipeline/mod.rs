//! Build sequencing.
//!
//! A run is an explicit list of steps, each with a failure policy, executed
//! in order by `Pipeline::run`:
//!
//! ```text
//! clean (halt) → copy-assets (continue) → compile-styles (halt)
//!   → optimize-images (continue) → build-scripts (halt) → minify-markup (continue)
//! ```
//!
//! - `halt`: the error is reported and the run stops with it
//! - `continue`: the error is reported and the next step runs
//!
//! Per-file failures inside a summary are reported and never halt.

pub mod report;

#[cfg(test)]
mod tests;

use std::time::Instant;

use crate::core::{StageError, StageId, StageSummary};
use crate::debug;
use crate::stage::{BuildContext, run_stage};

pub use report::Reporter;

/// What a failing step does to the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    Halt,
    Continue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub stage: StageId,
    pub policy: FailurePolicy,
}

impl Step {
    pub const fn halt(stage: StageId) -> Self {
        Self {
            stage,
            policy: FailurePolicy::Halt,
        }
    }

    pub const fn proceed(stage: StageId) -> Self {
        Self {
            stage,
            policy: FailurePolicy::Continue,
        }
    }
}

/// The `build` sequence.
pub const DEFAULT_SEQUENCE: &[Step] = &[
    Step::halt(StageId::Clean),
    Step::proceed(StageId::Assets),
    Step::halt(StageId::Styles),
    Step::proceed(StageId::Images),
    Step::halt(StageId::Scripts),
    Step::proceed(StageId::Markup),
];

/// Outcome of a run that did not halt.
#[derive(Debug, Default)]
pub struct RunReport {
    pub summaries: Vec<StageSummary>,
    /// Steps that errored under the `continue` policy.
    pub continued: Vec<StageId>,
}

impl RunReport {
    /// No step errored and no file failed.
    pub fn is_clean(&self) -> bool {
        self.continued.is_empty() && self.summaries.iter().all(StageSummary::is_clean)
    }

    pub fn written(&self) -> usize {
        self.summaries.iter().map(|s| s.written.len()).sum()
    }
}

pub struct Pipeline<'a> {
    steps: &'a [Step],
    reporter: &'a Reporter,
}

impl<'a> Pipeline<'a> {
    pub fn new(steps: &'a [Step], reporter: &'a Reporter) -> Self {
        Self { steps, reporter }
    }

    /// Pipeline over `DEFAULT_SEQUENCE`.
    pub fn standard(reporter: &'a Reporter) -> Self {
        Self::new(DEFAULT_SEQUENCE, reporter)
    }

    /// Run every step in order; returns the first error of a `halt` step.
    pub fn run(&self, ctx: &BuildContext<'_>) -> Result<RunReport, StageError> {
        let mut report = RunReport::default();

        for step in self.steps {
            let started = Instant::now();
            let result = run_stage(step.stage, ctx);
            debug!("build"; "{} took {:.2?}", step.stage, started.elapsed());
            self.reporter.report(step.stage, &result);

            match (result, step.policy) {
                (Ok(summary), _) => report.summaries.push(summary),
                (Err(e), FailurePolicy::Halt) => return Err(e),
                (Err(_), FailurePolicy::Continue) => report.continued.push(step.stage),
            }
        }
        Ok(report)
    }
}
