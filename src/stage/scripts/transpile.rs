//! Per-module syntax lowering with the oxc transformer.

use std::path::Path;

use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions};
use oxc::diagnostics::OxcDiagnostic;
use oxc::parser::Parser;
use oxc::semantic::SemanticBuilder;
use oxc::span::SourceType;
use oxc::transformer::{HelperLoaderMode, TransformOptions, Transformer};

use super::sourcemap::{MapToken, codegen_tokens};

/// A lowered module and its mapping back to the source it came from.
#[derive(Debug)]
pub struct Transpiled {
    pub code: String,
    pub tokens: Vec<MapToken>,
}

/// Lower one ES module to `target` (e.g. `es2015`), keeping its
/// import/export statements for the linker.
///
/// Runtime helpers are referenced as `babelHelpers.<name>`; the bundle
/// defines that object once.
pub fn transpile_module(source: &str, path: &Path, target: &str) -> Result<Transpiled, String> {
    let mut options = TransformOptions::from_target(target)?;
    options.helper_loader.mode = HelperLoaderMode::External;

    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::mjs()).parse();
    if ret.panicked || !ret.errors.is_empty() {
        return Err(join_diagnostics(&ret.errors));
    }
    let mut program = ret.program;

    let scoping = SemanticBuilder::new()
        .build(&program)
        .semantic
        .into_scoping();
    let ret = Transformer::new(&allocator, path, &options).build_with_scoping(scoping, &mut program);
    if !ret.errors.is_empty() {
        return Err(join_diagnostics(&ret.errors));
    }

    let ret = Codegen::new()
        .with_options(CodegenOptions {
            source_map_path: Some(path.to_path_buf()),
            ..CodegenOptions::default()
        })
        .build(&program);
    Ok(Transpiled {
        tokens: codegen_tokens(&ret),
        code: ret.code,
    })
}

pub fn join_diagnostics(errors: &[OxcDiagnostic]) -> String {
    if errors.is_empty() {
        return "parse failed".to_string();
    }
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowers_exponent_operator() {
        let out = transpile_module(
            "export const pow = (a, b) => a ** b;",
            Path::new("pow.js"),
            "es2015",
        )
        .unwrap()
        .code;
        assert!(out.contains("Math.pow(a, b)"), "{out}");
        assert!(out.contains("export const pow"), "{out}");
    }

    #[test]
    fn test_esnext_keeps_syntax() {
        let out = transpile_module("export const x = a?.b ?? 1;", Path::new("x.js"), "esnext")
            .unwrap()
            .code;
        assert!(out.contains("?."), "{out}");
    }

    #[test]
    fn test_async_uses_external_helper() {
        let out = transpile_module(
            "export async function load() { await fetch(\"/\"); }",
            Path::new("load.js"),
            "es2015",
        )
        .unwrap();
        assert!(out.code.contains("babelHelpers.asyncToGenerator"), "{}", out.code);
        assert!(!out.code.contains("@oxc-project/runtime"), "{}", out.code);
    }

    #[test]
    fn test_tokens_point_into_source() {
        let source = "export const a = 1;\n\nexport const b = a + 2;\n";
        let out = transpile_module(source, Path::new("ab.js"), "es2015").unwrap();
        assert!(!out.tokens.is_empty());
        assert!(out.tokens.iter().any(|t| t.src_line == 2));
        assert!(out.tokens.iter().all(|t| t.src_line <= 2));
    }

    #[test]
    fn test_syntax_error() {
        let err = transpile_module("export const = 1;", Path::new("bad.js"), "es2015")
            .unwrap_err();
        assert!(!err.is_empty());
    }

    #[test]
    fn test_unknown_target() {
        assert!(transpile_module("", Path::new("x.js"), "es1999").is_err());
    }
}
