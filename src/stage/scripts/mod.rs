//! `build-scripts`: bundle `src/js/scripts.js` into `dist/js/scripts.min.js`.
//!
//! ```text
//! entry ──► resolve + transpile each module ──► link (helpers + IIFE per module)
//!       ──► minify (compress + mangle) ──► codegen ──► compose source maps
//! ```
//!
//! Any error leaves `dist/js` untouched.

mod helpers;
mod link;
mod resolve;
mod sourcemap;
mod transpile;

#[cfg(test)]
mod tests;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

use crate::config::ScriptsConfig;
use crate::core::{IoContext, SCRIPT_OUTPUT, StageError, StageId, StageSummary};
use crate::utils::fs::write_file;

use super::BuildContext;
use resolve::{Loaded, ModuleGraph, ModuleLoader};
use sourcemap::MapToken;
use transpile::{join_diagnostics, transpile_module};

/// Name the final print gives the linked script; composition replaces it
/// with the module paths.
const LINKED_SOURCE: &str = "scripts.js";

pub fn run(ctx: &BuildContext<'_>) -> Result<StageSummary, StageError> {
    let entry = ctx.layout.script_entry();
    if !entry.is_file() {
        return Err(StageError::failed(
            StageId::Scripts,
            format!("entry `{}` not found", ctx.layout.relative(&entry).display()),
        ));
    }

    let bundle = bundle(&entry, &ctx.config.scripts, ctx.layout.root())
        .map_err(|message| StageError::failed(StageId::Scripts, message))?;

    let out_dir = ctx.layout.scripts_out();
    let js_path = out_dir.join(SCRIPT_OUTPUT);
    let map_path = out_dir.join(format!("{SCRIPT_OUTPUT}.map"));
    write_file(&js_path, &bundle.code).at_path(StageId::Scripts, &js_path)?;
    write_file(&map_path, &bundle.map).at_path(StageId::Scripts, &map_path)?;

    let mut summary = StageSummary::new(StageId::Scripts);
    summary.written.extend([js_path, map_path]);
    Ok(summary)
}

/// Bundled script and its source map.
pub struct Bundle {
    pub code: String,
    pub map: String,
}

/// Reads modules from disk and lowers them to the configured target.
struct TranspilingLoader<'a> {
    target: &'a str,
    root: &'a Path,
}

impl ModuleLoader for TranspilingLoader<'_> {
    fn load(&self, path: &Path) -> Result<Loaded, String> {
        let name = sourcemap::source_name(path, self.root);
        let source = std::fs::read_to_string(path).map_err(|e| format!("{name}: {e}"))?;
        let out = transpile_module(&source, path, self.target)
            .map_err(|e| format!("{name}: {e}"))?;
        let requests = link::module_requests(&out.code).map_err(|e| format!("{name}: {e}"))?;
        // unbundled helpers are reported against the module that needs them
        helpers::prelude(&helpers::referenced(&out.code)).map_err(|e| format!("{name}: {e}"))?;

        Ok(Loaded {
            source,
            code: out.code,
            tokens: out.tokens,
            requests,
        })
    }
}

pub fn bundle(entry: &Path, config: &ScriptsConfig, root: &Path) -> Result<Bundle, String> {
    let loader = TranspilingLoader {
        target: &config.target,
        root,
    };
    let graph = ModuleGraph::build(entry, &loader)?;

    let used: BTreeSet<String> = graph
        .modules
        .iter()
        .flat_map(|m| helpers::referenced(&m.code))
        .collect();
    crate::debug!("scripts"; "linking {} modules, {} helpers", graph.modules.len(), used.len());
    let prelude = helpers::prelude(&used)?;

    let linked = link::link(&graph, &prelude)?;
    let mut linked_map = sourcemap::linked_map(&graph, &linked, root)?;

    let (code, tokens) = print(&linked.code, config.minify)?;
    let map = sourcemap::compose(&tokens, &mut linked_map)?;
    let code = format!("{}\n//# sourceMappingURL={SCRIPT_OUTPUT}.map\n", code.trim_end());
    Ok(Bundle { code, map })
}

/// Minify (optionally) and print; tokens map back into `script`.
fn print(script: &str, minify: bool) -> Result<(String, Vec<MapToken>), String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, script, SourceType::cjs()).parse();
    if ret.panicked || !ret.errors.is_empty() {
        return Err(join_diagnostics(&ret.errors));
    }
    let mut program = ret.program;

    let scoping = if minify {
        let options = MinifierOptions {
            mangle: Some(MangleOptions::default()),
            compress: Some(CompressOptions::smallest()),
        };
        Minifier::new(options).minify(&allocator, &mut program).scoping
    } else {
        None
    };

    let ret = Codegen::new()
        .with_options(CodegenOptions {
            minify,
            comments: if minify {
                CommentOptions::disabled()
            } else {
                CommentOptions::default()
            },
            source_map_path: Some(PathBuf::from(LINKED_SOURCE)),
            ..CodegenOptions::default()
        })
        .with_scoping(scoping)
        .build(&program);

    let tokens = sourcemap::codegen_tokens(&ret);
    Ok((ret.code, tokens))
}
