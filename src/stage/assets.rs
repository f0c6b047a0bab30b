//! `copy-assets`: copy `src/assets/**` verbatim.

use std::path::Path;

use rayon::prelude::*;

use crate::core::{Failure, StageError, StageId, StageSummary};
use crate::utils::fs::{collect_files, mirror_path};

use super::BuildContext;

pub fn run(ctx: &BuildContext<'_>) -> Result<StageSummary, StageError> {
    let src = ctx.layout.assets_src();
    let out = ctx.layout.assets_out();
    let files = collect_files(&src);

    let results: Vec<_> = files
        .par_iter()
        .map(|file| copy_one(file, &src, &out))
        .collect();

    let mut summary = StageSummary::new(StageId::Assets);
    for (file, result) in files.iter().zip(results) {
        match result {
            Ok(dest) => summary.written.push(dest),
            Err(e) => summary.failures.push(Failure::at(
                StageId::Assets,
                ctx.layout.relative(file),
                e.to_string(),
            )),
        }
    }
    Ok(summary)
}

fn copy_one(file: &Path, src: &Path, out: &Path) -> std::io::Result<std::path::PathBuf> {
    let dest = mirror_path(file, src, out).ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "outside assets directory")
    })?;
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(file, &dest)?;
    Ok(dest)
}
