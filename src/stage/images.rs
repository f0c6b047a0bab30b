//! `optimize-images`: recompress changed rasters into `dist/images`.
//!
//! Output is never larger than the source: when re-encoding does not help,
//! the original bytes are written instead.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{AnimationDecoder, DynamicImage, ImageFormat, ImageResult};
use rayon::prelude::*;

use crate::core::{Failure, StageError, StageId, StageSummary};
use crate::logger::ProgressLine;
use crate::utils::fs::{collect_files_with_ext, is_output_fresh, mirror_path, write_file};

use super::BuildContext;

const EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];

/// GIF quantizer speed, 1 (best) to 30 (fastest).
const GIF_SPEED: i32 = 10;

enum Outcome {
    Written(PathBuf),
    Fresh,
}

pub fn run(ctx: &BuildContext<'_>) -> Result<StageSummary, StageError> {
    let src = ctx.layout.images_src();
    let out = ctx.layout.images_out();
    let quality = ctx.config.images.jpeg_quality;
    let files = collect_files_with_ext(&src, EXTENSIONS);

    let progress = ctx
        .show_progress()
        .then(|| ProgressLine::new(&[(StageId::Images.label(), files.len())]));

    let results: Vec<_> = files
        .par_iter()
        .map(|file| {
            let result = process_one(file, &src, &out, quality);
            if let Some(progress) = &progress {
                progress.inc(StageId::Images.label());
            }
            result
        })
        .collect();

    if let Some(progress) = progress {
        progress.finish();
    }

    let mut summary = StageSummary::new(StageId::Images);
    for (file, result) in files.iter().zip(results) {
        match result {
            Ok(Outcome::Written(dest)) => summary.written.push(dest),
            Ok(Outcome::Fresh) => summary.skipped += 1,
            Err(message) => summary.failures.push(Failure::at(
                StageId::Images,
                ctx.layout.relative(file),
                message,
            )),
        }
    }
    Ok(summary)
}

fn process_one(file: &Path, src: &Path, out: &Path, quality: u8) -> Result<Outcome, String> {
    let dest = mirror_path(file, src, out).ok_or("outside images directory")?;
    if is_output_fresh(file, &dest) {
        return Ok(Outcome::Fresh);
    }

    let original = std::fs::read(file).map_err(|e| e.to_string())?;
    let format = ImageFormat::from_path(file).map_err(|e| e.to_string())?;
    let optimized = optimize(&original, format, quality).map_err(|e| e.to_string())?;

    let bytes = if optimized.len() < original.len() {
        crate::debug!("images"; "{}: {} -> {} bytes", file.display(), original.len(), optimized.len());
        optimized
    } else {
        original
    };
    write_file(&dest, bytes).map_err(|e| e.to_string())?;
    Ok(Outcome::Written(dest))
}

/// Decode and re-encode `bytes` in their own format.
pub fn optimize(bytes: &[u8], format: ImageFormat, quality: u8) -> ImageResult<Vec<u8>> {
    let mut out = Vec::new();
    match format {
        ImageFormat::Gif => {
            let frames = GifDecoder::new(Cursor::new(bytes))?
                .into_frames()
                .collect_frames()?;
            let mut encoder = GifEncoder::new_with_speed(&mut out, GIF_SPEED);
            encoder.set_repeat(Repeat::Infinite)?;
            encoder.encode_frames(frames)?;
        }
        ImageFormat::Png => {
            let img = image::load_from_memory_with_format(bytes, format)?;
            let encoder =
                PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive);
            img.write_with_encoder(encoder)?;
        }
        _ => {
            let img = image::load_from_memory_with_format(bytes, format)?;
            let img = match img {
                DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => img,
                other => DynamicImage::ImageRgb8(other.to_rgb8()),
            };
            let encoder = JpegEncoder::new_with_quality(&mut out, quality);
            img.write_with_encoder(encoder)?;
        }
    }
    Ok(out)
}
