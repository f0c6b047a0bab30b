//! Command runners: one stage, the full sequence, or the dev server.

use std::time::Instant;

use anyhow::{Result, anyhow};

use super::serve::DevServer;
use crate::config::ProjectConfig;
use crate::core::{ShutdownSignal, StageError, StageId};
use crate::log;
use crate::pipeline::{Pipeline, Reporter};
use crate::stage::{BuildContext, run_stage};

/// Run a single task subcommand.
pub fn run_task(stage: StageId, config: &ProjectConfig) -> Result<()> {
    let ctx = BuildContext::new(config).with_progress();
    let result = run_stage(stage, &ctx);
    Reporter::terminal().report(stage, &result);
    result.map(|_| ()).map_err(halted)
}

/// Run every step of the default sequence.
pub fn build_all(config: &ProjectConfig) -> Result<()> {
    let started = Instant::now();
    let reporter = Reporter::terminal();
    let ctx = BuildContext::new(config).with_progress();

    let report = Pipeline::standard(&reporter).run(&ctx).map_err(halted)?;

    if report.is_clean() {
        log!("build"; "{} files in {:.2?}", report.written(), started.elapsed());
    } else {
        let failed: usize = report.summaries.iter().map(|s| s.failures.len()).sum::<usize>()
            + report.continued.len();
        log!("build"; "{} files in {:.2?}, {} failed", report.written(), started.elapsed(), failed);
    }
    Ok(())
}

/// Serve `dist/` until Ctrl+C.
pub fn serve(config: ProjectConfig, signal: &ShutdownSignal) -> Result<()> {
    let handle = DevServer::new(config).start()?;
    handle.wait(signal);
    Ok(())
}

/// The reporter already printed the details.
fn halted(e: StageError) -> anyhow::Error {
    anyhow!("{} halted", e.stage())
}
