//! Bundle source map: module maps carried through the linker, then through
//! the final print.
//!
//! ```text
//! module source ──transpile──► module code ──link──► linked script ──print──► scripts.min.js
//!        ◄──── module tokens ────   ◄── copied ranges ──   ◄── print tokens ──
//! ```

use std::path::Path;

use oxc::codegen::CodegenReturn;
use parcel_sourcemap::{OriginalLocation, SourceMap};

use super::link::Linked;
use super::resolve::ModuleGraph;

/// Generated → original position. Lines are zero-based, columns count
/// UTF-16 units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapToken {
    pub gen_line: u32,
    pub gen_col: u32,
    pub src_line: u32,
    pub src_col: u32,
}

/// Tokens of a codegen result that point into its source.
pub fn codegen_tokens(ret: &CodegenReturn) -> Vec<MapToken> {
    let Some(map) = &ret.map else {
        return Vec::new();
    };
    map.get_tokens()
        .filter(|t| t.get_source_id().is_some())
        .map(|t| MapToken {
            gen_line: t.get_dst_line(),
            gen_col: t.get_dst_col(),
            src_line: t.get_src_line(),
            src_col: t.get_src_col(),
        })
        .collect()
}

/// Line starts of a text, for byte offset ↔ (line, column) conversion.
pub struct LineIndex<'a> {
    text: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { text, starts }
    }

    /// Byte offset of `(line, col)`, clamped to the end of the line.
    pub fn offset(&self, line: u32, col: u32) -> Option<usize> {
        let start = *self.starts.get(line as usize)?;
        let end = self
            .starts
            .get(line as usize + 1)
            .map_or(self.text.len(), |next| next - 1);

        let mut units = 0;
        for (i, ch) in self.text[start..end].char_indices() {
            if units >= col {
                return Some(start + i);
            }
            units += ch.len_utf16() as u32;
        }
        Some(end)
    }

    pub fn position(&self, offset: usize) -> (u32, u32) {
        let line = self.starts.partition_point(|&s| s <= offset).saturating_sub(1);
        let col = self.text[self.starts[line]..offset].encode_utf16().count();
        (line as u32, col as u32)
    }
}

/// Name of a module in `sources`: its path under the project root.
pub fn source_name(path: &Path, root: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
        Err(_) => path.display().to_string(),
    }
}

/// Map of the linked script back to every module's original source.
pub fn linked_map(graph: &ModuleGraph, linked: &Linked, root: &Path) -> Result<SourceMap, String> {
    let mut map = SourceMap::new("/");
    let linked_index = LineIndex::new(&linked.code);

    for piece in &linked.pieces {
        let module = &graph.modules[piece.module];
        let source = map.add_source(&source_name(&module.path, root));
        map.set_source_content(source as usize, &module.source)
            .map_err(|e| format!("{e:?}"))?;

        let module_index = LineIndex::new(&module.code);
        for token in &module.tokens {
            let Some(offset) = module_index.offset(token.gen_line, token.gen_col) else {
                continue;
            };
            let Some(linked_offset) = piece.translate(offset) else {
                continue;
            };
            let (line, col) = linked_index.position(linked_offset);
            map.add_mapping(
                line,
                col,
                Some(OriginalLocation::new(token.src_line, token.src_col, source, None)),
            );
        }
    }
    Ok(map)
}

/// Route `printed` tokens (output → linked script) through `linked`
/// (linked script → modules). Sources keep their order.
pub fn compose(printed: &[MapToken], linked: &mut SourceMap) -> Result<String, String> {
    let mut out = SourceMap::new("/");
    let sources = linked.get_sources().clone();
    for (i, name) in sources.iter().enumerate() {
        let index = out.add_source(name);
        let content = linked
            .get_source_content(i as u32)
            .map_err(|e| format!("{e:?}"))?
            .to_string();
        out.set_source_content(index as usize, &content)
            .map_err(|e| format!("{e:?}"))?;
    }

    for token in printed {
        let original = linked
            .find_closest_mapping(token.src_line, token.src_col)
            .and_then(|m| m.original);
        if let Some(original) = original {
            out.add_mapping(token.gen_line, token.gen_col, Some(original));
        }
    }
    out.to_json(None).map_err(|e| format!("{e:?}"))
}
