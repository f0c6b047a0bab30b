//! `compile-styles`: Sass → prefixed, minified CSS with source maps.
//!
//! Every entry is compiled before anything is written, so a Sass error in
//! any entry leaves `dist/css` untouched.

mod grid;

use std::cell::RefCell;
use std::io;
use std::path::{Path, PathBuf};

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use parcel_sourcemap::SourceMap;
use rayon::prelude::*;

use crate::core::{IoContext, StageError, StageId, StageSummary, minified_name};
use crate::utils::fs::{collect_files_with_ext, mirror_path, normalize_path, write_file};

use super::BuildContext;
use grid::GridPlan;

/// Compiled output of one entry.
#[derive(Debug)]
struct CompiledStyle {
    css_path: PathBuf,
    map_path: PathBuf,
    css: String,
    map: String,
}

pub fn run(ctx: &BuildContext<'_>) -> Result<StageSummary, StageError> {
    let src = ctx.layout.styles_src();
    let out = ctx.layout.styles_out();
    let browsers = ctx.config.styles.targets.to_browsers();
    let entries = collect_entries(&src);

    let results: Vec<_> = entries
        .par_iter()
        .map(|entry| compile_entry(entry, &src, &out, ctx.layout.root(), browsers))
        .collect();

    let mut compiled = Vec::with_capacity(results.len());
    let mut errors = Vec::new();
    for (entry, result) in entries.iter().zip(results) {
        match result {
            Ok(style) => compiled.push(style),
            Err(message) => {
                errors.push(format!("{}: {}", ctx.layout.relative(entry).display(), message))
            }
        }
    }
    if !errors.is_empty() {
        return Err(StageError::failed(StageId::Styles, errors.join("\n")));
    }

    let mut summary = StageSummary::new(StageId::Styles);
    for style in compiled {
        write_file(&style.css_path, &style.css).at_path(StageId::Styles, &style.css_path)?;
        write_file(&style.map_path, &style.map).at_path(StageId::Styles, &style.map_path)?;
        summary.written.push(style.css_path);
        summary.written.push(style.map_path);
    }

    if let Some(publisher) = ctx.publisher() {
        let paths = css_url_paths(&summary.written, &ctx.layout.output_dir());
        if !paths.is_empty() {
            publisher.css_changed(paths);
        }
    }
    Ok(summary)
}

/// Non-partial `.scss` files: names starting with `_` are import-only.
fn collect_entries(src: &Path) -> Vec<PathBuf> {
    collect_files_with_ext(src, &["scss"])
        .into_iter()
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| !n.starts_with('_'))
        })
        .collect()
}

/// Sass file system that remembers every file the compiler read.
#[derive(Debug, Default)]
struct RecordingFs {
    read: RefCell<Vec<PathBuf>>,
}

impl RecordingFs {
    /// Files read, first read first, without repeats.
    fn into_read(self) -> Vec<PathBuf> {
        let mut read = self.read.into_inner();
        let mut seen = rustc_hash::FxHashSet::default();
        read.retain(|p| seen.insert(p.clone()));
        read
    }
}

impl grass::Fs for RecordingFs {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let bytes = std::fs::read(path)?;
        self.read.borrow_mut().push(normalize_path(path));
        Ok(bytes)
    }
}

/// A Sass file that went into an entry, for the map's `sources`.
#[derive(Debug)]
struct SassSource {
    name: String,
    content: String,
}

fn compile_entry(
    entry: &Path,
    src: &Path,
    out: &Path,
    root: &Path,
    browsers: Browsers,
) -> Result<CompiledStyle, String> {
    let stem = entry
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or("invalid file name")?;
    let css_name = minified_name(&format!("{stem}.css"));
    let map_name = format!("{css_name}.map");

    let dest_dir = entry
        .parent()
        .and_then(|dir| mirror_path(dir, src, out))
        .ok_or("outside styles directory")?;

    let mut load_paths = vec![src.to_path_buf()];
    if let Some(dir) = entry.parent() {
        load_paths.insert(0, dir.to_path_buf());
    }
    let fs = RecordingFs::default();
    let compiled = {
        let options = grass::Options::default().fs(&fs).load_paths(&load_paths);
        grass::from_path(entry, &options).map_err(|e| e.to_string())?
    };

    let sass_sources = fs
        .into_read()
        .into_iter()
        .map(|path| {
            let content = std::fs::read_to_string(&path).map_err(|e| e.to_string())?;
            let name = match path.strip_prefix(root) {
                Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
                Err(_) => path.display().to_string(),
            };
            Ok(SassSource { name, content })
        })
        .collect::<Result<Vec<_>, String>>()?;

    let (css, map) = transform_css(&compiled, &format!("{stem}.css"), &sass_sources, browsers)?;
    let css = format!("{css}\n/*# sourceMappingURL={map_name} */\n");

    Ok(CompiledStyle {
        css_path: dest_dir.join(&css_name),
        map_path: dest_dir.join(&map_name),
        css,
        map,
    })
}

/// Prefix for `browsers`, minify and print with a source map.
///
/// Mappings point into the compiled (pre-minify) CSS, source 0. The Sass
/// files it was compiled from follow it in `sources`, all with
/// `sourcesContent` embedded.
fn transform_css(
    css: &str,
    source_name: &str,
    sass_sources: &[SassSource],
    browsers: Browsers,
) -> Result<(String, String), String> {
    let targets = Targets::from(browsers);

    let grid = if browsers.ie.is_some() {
        GridPlan::new(css)?
    } else {
        GridPlan::default()
    };
    let buffer = format!("{css}{}", grid.values());
    let (source, grid_values) = buffer.split_at(css.len());

    let mut stylesheet = StyleSheet::parse(
        source,
        ParserOptions {
            filename: source_name.to_string(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| e.to_string())?;
    if !grid.is_empty() {
        grid.apply(&mut stylesheet.rules, grid_values)?;
    }

    stylesheet
        .minify(MinifyOptions {
            targets,
            ..MinifyOptions::default()
        })
        .map_err(|e| e.to_string())?;

    let mut source_map = SourceMap::new("/");
    source_map.add_source(source_name);
    source_map
        .set_source_content(0, css)
        .map_err(|e| format!("{e:?}"))?;
    for sass in sass_sources {
        let index = source_map.add_source(&sass.name);
        source_map
            .set_source_content(index as usize, &sass.content)
            .map_err(|e| format!("{e:?}"))?;
    }

    let result = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            source_map: Some(&mut source_map),
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| e.to_string())?;

    let map = source_map.to_json(None).map_err(|e| format!("{e:?}"))?;
    Ok((result.code, map))
}

/// URL paths (`/css/main.min.css`) of the stylesheets among `written`.
fn css_url_paths(written: &[PathBuf], output_dir: &Path) -> Vec<String> {
    written
        .iter()
        .filter(|p| p.extension().is_some_and(|e| e == "css"))
        .filter_map(|p| p.strip_prefix(output_dir).ok())
        .map(|rel| format!("/{}", rel.to_string_lossy().replace('\\', "/")))
        .collect()
}
