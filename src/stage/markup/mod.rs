//! `minify-markup`: src/html/**/*.html → dist/ with the same relative paths.
//!
//! Minification is conservative: attribute and class order are normalized,
//! whitespace runs are collapsed and dropped next to block-level tags.
//! Comments, doctype and the content of `script`, `style`, `pre` and
//! `textarea` pass through untouched.

mod tokenize;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::core::{Failure, StageError, StageId, StageSummary};
use crate::debug;
use crate::utils::fs::{collect_files_with_ext, mirror_path, write_file};
use crate::utils::html::{escape_attr, is_inline_element, is_void_element};

use super::BuildContext;
use tokenize::{Token, tokenize};

pub fn run(ctx: &BuildContext<'_>) -> Result<StageSummary, StageError> {
    let src = ctx.layout.markup_src();
    let dist = ctx.layout.markup_out();
    let pages = collect_files_with_ext(&src, &["html"]);

    let results: Vec<_> = pages
        .par_iter()
        .map(|page| minify_page(page, &src, &dist))
        .collect();

    let mut summary = StageSummary::new(StageId::Markup);
    for (page, result) in pages.iter().zip(results) {
        let rel = ctx.layout.relative(page);
        match result {
            Ok(out) => {
                debug!("markup"; "{}", rel.display());
                summary.written.push(out);
            }
            Err(e) => summary
                .failures
                .push(Failure::at(StageId::Markup, rel, e.to_string())),
        }
    }
    Ok(summary)
}

fn minify_page(page: &Path, src: &Path, dist: &Path) -> io::Result<PathBuf> {
    let out = mirror_path(page, src, dist)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "outside html directory"))?;
    let html = fs::read_to_string(page)?;
    write_file(&out, minify_html(&html))?;
    Ok(out)
}

/// Minify an HTML document.
///
/// ```ignore
/// assert_eq!(minify_html(r#"<DIV class="b a">x</DIV>"#), r#"<div class="a b">x</div>"#);
/// ```
pub fn minify_html(input: &str) -> String {
    let tokens = tokenize(input);
    let mut out = String::with_capacity(input.len());

    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::Doctype(raw) | Token::Comment(raw) | Token::Raw(raw) => out.push_str(raw),
            Token::StartTag { name, attrs, self_closing } => {
                write_start_tag(&mut out, name, attrs, *self_closing);
            }
            Token::EndTag { name } => {
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
            Token::Text(text) => {
                let before = i == 0 || is_block_boundary(&tokens[i - 1]);
                let after = tokens.get(i + 1).is_none_or(is_block_boundary);
                out.push_str(&collapse_whitespace(text, before, after));
            }
        }
    }
    out
}

/// Tags of non-inline elements and the doctype swallow adjacent whitespace.
fn is_block_boundary(token: &Token<'_>) -> bool {
    match token {
        Token::StartTag { name, .. } | Token::EndTag { name } => !is_inline_element(name),
        Token::Doctype(_) => true,
        Token::Comment(_) | Token::Text(_) | Token::Raw(_) => false,
    }
}

fn collapse_whitespace(text: &str, trim_start: bool, trim_end: bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.chars() {
        if c.is_ascii_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && (!out.is_empty() || !trim_start) {
            out.push(' ');
        }
        pending_space = false;
        out.push(c);
    }
    if pending_space && !trim_end && (!out.is_empty() || !trim_start) {
        out.push(' ');
    }
    out
}

fn write_start_tag(out: &mut String, name: &str, attrs: &[(String, Option<String>)], self_closing: bool) {
    out.push('<');
    out.push_str(name);

    for (key, value) in normalize_attributes(attrs) {
        out.push(' ');
        out.push_str(&key);
        if let Some(value) = value {
            out.push_str("=\"");
            out.push_str(&escape_attr(&value));
            out.push('"');
        }
    }

    // Void elements need no slash; foreign elements (svg) rely on it.
    if self_closing && !is_void_element(name) {
        out.push('/');
    }
    out.push('>');
}

/// Lowercase names, keep the first of duplicates, sort by name, and sort
/// and dedupe class tokens.
fn normalize_attributes(attrs: &[(String, Option<String>)]) -> Vec<(String, Option<String>)> {
    let mut seen = rustc_hash::FxHashSet::default();
    let mut normalized: Vec<_> = attrs
        .iter()
        .filter_map(|(key, value)| {
            let key = key.to_ascii_lowercase();
            if !seen.insert(key.clone()) {
                return None;
            }
            let value = match (key.as_str(), value) {
                ("class", Some(classes)) => Some(normalize_classes(classes)),
                _ => value.clone(),
            };
            Some((key, value))
        })
        .collect();
    normalized.sort_by(|a, b| a.0.cmp(&b.0));
    normalized
}

fn normalize_classes(classes: &str) -> String {
    let mut tokens: Vec<&str> = classes.split_ascii_whitespace().collect();
    tokens.sort_unstable();
    tokens.dedup();
    tokens.join(" ")
}
