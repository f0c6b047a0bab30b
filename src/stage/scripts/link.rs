//! Links a module graph into one classic script.
//!
//! Each module becomes a strict-mode IIFE that returns its export object:
//!
//! ```text
//! var __kiln_m0__ = (function () {
//! "use strict";
//! var __kiln_exports__ = {};
//! var helper = __kiln_m1__["helper"];               // import { helper } from "./dep"
//! Object.defineProperty(__kiln_exports__, "run", …); // export function run() {}
//! function run() {}
//! return __kiln_exports__;
//! })();
//! ```
//!
//! Exports are live getters; imports are read once, after the dependency has
//! fully run (modules are emitted in dependency order, cycles are rejected).

use oxc::allocator::Allocator;
use oxc::ast::ast::{
    Declaration, ExportDefaultDeclarationKind, ImportDeclarationSpecifier, ModuleExportName,
    Statement,
};
use oxc_ecmascript::BoundNames;
use oxc::parser::Parser;
use oxc::span::{GetSpan, SourceType, Span};

use super::resolve::{Module, ModuleGraph};
use super::transpile::join_diagnostics;

const EXPORTS: &str = "__kiln_exports__";
const DEFAULT_LOCAL: &str = "__kiln_default__";

fn module_var(id: usize) -> String {
    format!("__kiln_m{id}__")
}

/// Import specifiers of a module, in source order.
pub fn module_requests(code: &str) -> Result<Vec<String>, String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, code, SourceType::mjs()).parse();
    if ret.panicked || !ret.errors.is_empty() {
        return Err(join_diagnostics(&ret.errors));
    }

    let mut requests = Vec::new();
    for stmt in &ret.program.body {
        let source = match stmt {
            Statement::ImportDeclaration(decl) => Some(&decl.source),
            Statement::ExportNamedDeclaration(decl) => decl.source.as_ref(),
            Statement::ExportAllDeclaration(decl) => Some(&decl.source),
            _ => None,
        };
        if let Some(source) = source {
            requests.push(source.value.to_string());
        }
    }
    Ok(requests)
}

/// The linked script, and where each module's code landed in it.
#[derive(Debug)]
pub struct Linked {
    pub code: String,
    pub pieces: Vec<Piece>,
}

/// One module's text in the linked script.
#[derive(Debug)]
pub struct Piece {
    /// Index into `ModuleGraph::modules`.
    pub module: usize,
    copied: Vec<Copied>,
}

impl Piece {
    /// Linked offset of byte `offset` of the module code, if that byte was
    /// copied through unchanged.
    pub fn translate(&self, offset: usize) -> Option<usize> {
        self.copied
            .iter()
            .find(|c| offset >= c.src && offset < c.src + c.len)
            .map(|c| c.out + (offset - c.src))
    }
}

/// A run of module code copied verbatim to `out`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Copied {
    out: usize,
    src: usize,
    len: usize,
}

/// Concatenate every module of `graph` into one script, entry last.
/// `prelude` opens the script, ahead of every module.
pub fn link(graph: &ModuleGraph, prelude: &str) -> Result<Linked, String> {
    let mut code = String::from("(function () {\n");
    code.push_str(prelude);

    let mut pieces = Vec::with_capacity(graph.modules.len());
    for (id, module) in graph.modules.iter().enumerate() {
        let wrapped = wrap_module(id, module)?;
        let base = code.len();
        code.push_str(&wrapped.text);
        pieces.push(Piece {
            module: id,
            copied: wrapped
                .copied
                .into_iter()
                .map(|c| Copied { out: c.out + base, ..c })
                .collect(),
        });
    }
    code.push_str("})();\n");
    Ok(Linked { code, pieces })
}

/// What a module exports under one name.
enum ExportTarget {
    /// A binding in the module's own scope.
    Local(String),
    /// A property of a dependency's export object.
    Reexport { module: usize, name: String },
    /// A dependency's whole export object (`export * as ns`).
    Namespace(usize),
}

/// Text edit on the module source.
struct Edit {
    span: Span,
    text: String,
}

#[derive(Default)]
struct ModuleParts {
    imports: Vec<String>,
    exports: Vec<(String, ExportTarget)>,
    star_reexports: Vec<usize>,
    edits: Vec<Edit>,
}

#[derive(Debug)]
struct Wrapped {
    text: String,
    /// Copied runs, `out` relative to `text`.
    copied: Vec<Copied>,
}

fn wrap_module(id: usize, module: &Module) -> Result<Wrapped, String> {
    let parts = analyze(module)?;
    let (body, copied) = apply_edits(&module.code, parts.edits);

    let mut out = String::new();
    out.push_str(&format!(
        "var {} = (function () {{\n\"use strict\";\nvar {EXPORTS} = {{}};\n",
        module_var(id)
    ));
    for import in &parts.imports {
        out.push_str(import);
        out.push('\n');
    }
    for (name, target) in &parts.exports {
        let getter = match target {
            ExportTarget::Local(local) => local.clone(),
            ExportTarget::Reexport { module, name } => {
                format!("{}[{}]", module_var(*module), quote(name))
            }
            ExportTarget::Namespace(module) => module_var(*module),
        };
        out.push_str(&format!(
            "Object.defineProperty({EXPORTS}, {}, {{ enumerable: true, get: function () {{ return {getter}; }} }});\n",
            quote(name)
        ));
    }
    for dep in &parts.star_reexports {
        let dep = module_var(*dep);
        out.push_str(&format!(
            "Object.keys({dep}).forEach(function (k) {{ if (k !== \"default\" && !Object.prototype.hasOwnProperty.call({EXPORTS}, k)) Object.defineProperty({EXPORTS}, k, {{ enumerable: true, get: function () {{ return {dep}[k]; }} }}); }});\n"
        ));
    }
    let body_start = out.len();
    out.push_str(&body);
    out.push_str(&format!("\nreturn {EXPORTS};\n}})();\n"));
    Ok(Wrapped {
        text: out,
        copied: copied
            .into_iter()
            .map(|c| Copied { out: c.out + body_start, ..c })
            .collect(),
    })
}

fn analyze(module: &Module) -> Result<ModuleParts, String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, &module.code, SourceType::mjs()).parse();
    if ret.panicked || !ret.errors.is_empty() {
        return Err(join_diagnostics(&ret.errors));
    }

    let dep = |specifier: &str| {
        module
            .deps
            .get(specifier)
            .copied()
            .ok_or_else(|| format!("unresolved import `{specifier}`"))
    };

    let mut parts = ModuleParts::default();
    for stmt in &ret.program.body {
        match stmt {
            Statement::ImportDeclaration(decl) => {
                let dep_var = module_var(dep(decl.source.value.as_str())?);
                for spec in decl.specifiers.iter().flatten() {
                    let line = match spec {
                        ImportDeclarationSpecifier::ImportSpecifier(s) => format!(
                            "var {} = {dep_var}[{}];",
                            s.local.name,
                            quote(&export_name(&s.imported))
                        ),
                        ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                            format!("var {} = {dep_var}[\"default\"];", s.local.name)
                        }
                        ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                            format!("var {} = {dep_var};", s.local.name)
                        }
                    };
                    parts.imports.push(line);
                }
                parts.edits.push(remove(decl.span));
            }

            Statement::ExportNamedDeclaration(decl) => {
                if let Some(declaration) = &decl.declaration {
                    for name in declared_names(declaration) {
                        parts.exports.push((name.clone(), ExportTarget::Local(name)));
                    }
                    parts.edits.push(Edit {
                        span: Span::new(decl.span.start, declaration.span().start),
                        text: String::new(),
                    });
                    continue;
                }

                let source = match &decl.source {
                    Some(source) => Some(dep(source.value.as_str())?),
                    None => None,
                };
                for spec in &decl.specifiers {
                    let exported = export_name(&spec.exported);
                    let local = export_name(&spec.local);
                    let target = match source {
                        Some(module) => ExportTarget::Reexport { module, name: local },
                        None => ExportTarget::Local(local),
                    };
                    parts.exports.push((exported, target));
                }
                parts.edits.push(remove(decl.span));
            }

            Statement::ExportDefaultDeclaration(decl) => {
                let inner = decl.declaration.span();
                let named = match &decl.declaration {
                    ExportDefaultDeclarationKind::FunctionDeclaration(f) => {
                        Some(f.id.as_ref().map(|id| id.name.to_string()))
                    }
                    ExportDefaultDeclarationKind::ClassDeclaration(c) => {
                        Some(c.id.as_ref().map(|id| id.name.to_string()))
                    }
                    _ => None,
                };
                match named {
                    // export default function name() {}
                    Some(Some(name)) => {
                        parts.exports.push(("default".into(), ExportTarget::Local(name)));
                        parts.edits.push(Edit {
                            span: Span::new(decl.span.start, inner.start),
                            text: String::new(),
                        });
                    }
                    // export default function () {}  /  export default <expr>
                    anonymous => {
                        parts.exports.push((
                            "default".into(),
                            ExportTarget::Local(DEFAULT_LOCAL.into()),
                        ));
                        parts.edits.push(Edit {
                            span: Span::new(decl.span.start, inner.start),
                            text: format!("var {DEFAULT_LOCAL} = "),
                        });
                        if anonymous.is_some() {
                            parts.edits.push(Edit {
                                span: Span::new(inner.end, inner.end),
                                text: ";".into(),
                            });
                        }
                    }
                }
            }

            Statement::ExportAllDeclaration(decl) => {
                let module = dep(decl.source.value.as_str())?;
                match &decl.exported {
                    Some(name) => parts
                        .exports
                        .push((export_name(name), ExportTarget::Namespace(module))),
                    None => parts.star_reexports.push(module),
                }
                parts.edits.push(remove(decl.span));
            }

            _ => {}
        }
    }
    Ok(parts)
}

fn declared_names(declaration: &Declaration<'_>) -> Vec<String> {
    let mut names = Vec::new();
    match declaration {
        Declaration::VariableDeclaration(var) => {
            var.bound_names(&mut |ident| names.push(ident.name.to_string()));
        }
        Declaration::FunctionDeclaration(f) => {
            if let Some(id) = &f.id {
                names.push(id.name.to_string());
            }
        }
        Declaration::ClassDeclaration(c) => {
            if let Some(id) = &c.id {
                names.push(id.name.to_string());
            }
        }
        _ => {}
    }
    names
}

fn export_name(name: &ModuleExportName<'_>) -> String {
    name.name().to_string()
}

fn remove(span: Span) -> Edit {
    Edit {
        span,
        text: String::new(),
    }
}

/// JSON string literal, valid as a JS property key.
fn quote(name: &str) -> String {
    serde_json::to_string(name).unwrap_or_else(|_| format!("\"{name}\""))
}

fn apply_edits(code: &str, mut edits: Vec<Edit>) -> (String, Vec<Copied>) {
    edits.sort_by_key(|e| (e.span.start, e.span.end));
    let mut out = String::with_capacity(code.len());
    let mut copied = Vec::new();
    let mut copy = |out: &mut String, from: usize, to: usize| {
        if to > from {
            copied.push(Copied { out: out.len(), src: from, len: to - from });
            out.push_str(&code[from..to]);
        }
    };

    let mut cursor = 0usize;
    for edit in edits {
        let start = edit.span.start as usize;
        let end = edit.span.end as usize;
        if start < cursor {
            continue;
        }
        copy(&mut out, cursor, start);
        out.push_str(&edit.text);
        cursor = end;
    }
    copy(&mut out, cursor, code.len());
    (out, copied)
}
