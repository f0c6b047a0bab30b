//! `clean`: remove the output tree.

use std::io::ErrorKind;

use crate::core::{StageError, StageId, StageSummary};

use super::BuildContext;

pub fn run(ctx: &BuildContext<'_>) -> Result<StageSummary, StageError> {
    let output = ctx.layout.output_dir();
    match std::fs::remove_dir_all(&output) {
        Ok(()) => {
            crate::debug!("clean"; "removed {}", output.display());
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(StageError::io(StageId::Clean, output, e)),
    }
    Ok(StageSummary::new(StageId::Clean))
}
