//! Forgiving HTML tokenizer.
//!
//! Produces just enough structure for minification: tags with parsed
//! attributes, text, and verbatim chunks (comments, doctype, raw text).
//! Malformed markup degrades to text instead of failing.

use crate::utils::html::{is_raw_text_element, is_whitespace_preserving, parse_attributes};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// `<!DOCTYPE …>`, `<?…?>`
    Doctype(&'a str),
    /// `<!-- … -->`, `<![CDATA[ … ]]>`
    Comment(&'a str),
    StartTag {
        /// Lowercased tag name.
        name: String,
        attrs: Vec<(String, Option<String>)>,
        self_closing: bool,
    },
    EndTag {
        name: String,
    },
    Text(&'a str),
    /// Content of `script`, `style`, `pre`, `textarea`; never rewritten.
    Raw(&'a str),
}

pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    Tokenizer { input, pos: 0, text_start: 0, tokens: Vec::new() }.run()
}

struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
    /// Start of the pending text run.
    text_start: usize,
    tokens: Vec<Token<'a>>,
}

impl<'a> Tokenizer<'a> {
    fn run(mut self) -> Vec<Token<'a>> {
        while let Some(offset) = self.input[self.pos..].find('<') {
            let lt = self.pos + offset;
            self.pos = lt;
            if !self.markup_at(lt) {
                self.pos = lt + 1;
            }
        }
        self.flush_text(self.input.len());
        self.tokens
    }

    fn rest(&self, at: usize) -> &'a str {
        &self.input[at..]
    }

    fn flush_text(&mut self, end: usize) {
        if end > self.text_start {
            self.tokens.push(Token::Text(&self.input[self.text_start..end]));
        }
        self.text_start = end;
    }

    /// Emit `token` covering `lt..end`; the next text starts at `end`.
    fn emit(&mut self, lt: usize, end: usize, token: Token<'a>) {
        self.flush_text(lt);
        self.tokens.push(token);
        self.pos = end;
        self.text_start = end;
    }

    /// Try to read markup at `lt`. Returns false when `<` is literal text.
    fn markup_at(&mut self, lt: usize) -> bool {
        let rest = self.rest(lt);

        if rest.starts_with("<!--") {
            let end = find_after(rest, "-->", 4).map_or(self.input.len(), |e| lt + e);
            self.emit(lt, end, Token::Comment(&self.input[lt..end]));
            return true;
        }
        if rest.starts_with("<![CDATA[") {
            let end = find_after(rest, "]]>", 9).map_or(self.input.len(), |e| lt + e);
            self.emit(lt, end, Token::Comment(&self.input[lt..end]));
            return true;
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            let end = find_after(rest, ">", 2).map_or(self.input.len(), |e| lt + e);
            self.emit(lt, end, Token::Doctype(&self.input[lt..end]));
            return true;
        }
        if let Some(after) = rest.strip_prefix("</") {
            if !after.starts_with(|c: char| c.is_ascii_alphabetic()) {
                return false;
            }
            let Some(close) = rest.find('>') else {
                return false;
            };
            let name = rest[2..close].trim().to_ascii_lowercase();
            self.emit(lt, lt + close + 1, Token::EndTag { name });
            return true;
        }
        if rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
            return self.start_tag(lt);
        }
        false
    }

    fn start_tag(&mut self, lt: usize) -> bool {
        let rest = self.rest(lt);
        let name_len = rest[1..]
            .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
            .unwrap_or(rest.len() - 1);
        let name = rest[1..1 + name_len].to_ascii_lowercase();

        let Some(close) = find_tag_end(rest, 1 + name_len) else {
            return false;
        };
        let inner = &rest[1 + name_len..close];
        let self_closing = inner.trim_end().ends_with('/');
        let attrs = parse_attributes(inner);
        let end = lt + close + 1;

        let raw = is_raw_text_element(&name) || is_whitespace_preserving(&name);
        self.emit(lt, end, Token::StartTag { name: name.clone(), attrs, self_closing });

        if raw && !self_closing {
            let content_end = find_end_tag(self.rest(end), &name).map_or(self.input.len(), |i| end + i);
            if content_end > end {
                self.tokens.push(Token::Raw(&self.input[end..content_end]));
            }
            self.pos = content_end;
            self.text_start = content_end;
        }
        true
    }
}

/// Index just past `needle`, searching from `from`.
fn find_after(s: &str, needle: &str, from: usize) -> Option<usize> {
    s.get(from..)?.find(needle).map(|i| from + i + needle.len())
}

/// Index of the `>` closing a start tag, skipping quoted attribute values.
fn find_tag_end(s: &str, from: usize) -> Option<usize> {
    let mut quote = None;
    for (i, c) in s.char_indices().skip_while(|(i, _)| *i < from) {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') => return Some(i),
            (None, '<') => return None,
            _ => {}
        }
    }
    None
}

/// Offset of `</name` (case-insensitive) in `s`.
fn find_end_tag(s: &str, name: &str) -> Option<usize> {
    let needle = format!("</{name}");
    let lower = s.to_ascii_lowercase();
    let mut from = 0;
    while let Some(i) = lower[from..].find(&needle) {
        let at = from + i;
        let next = lower[at + needle.len()..].chars().next();
        if next.is_none_or(|c| c == '>' || c == '/' || c.is_whitespace()) {
            return Some(at);
        }
        from = at + needle.len();
    }
    None
}
