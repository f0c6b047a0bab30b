//! HTML helpers for the markup minifier and the dev server.
//!
//! - `escape_attr()` - quote-safe attribute values
//! - `is_void_element()`, `is_raw_text_element()`, `is_whitespace_preserving()`
//! - `is_inline_element()` - elements whose surrounding whitespace is significant
//! - `parse_attributes()` - attribute list of a start tag

use std::borrow::Cow;

/// Escape an attribute value for a double-quoted context.
///
/// Only `"` needs escaping; existing entity references are kept as written.
pub fn escape_attr(s: &str) -> Cow<'_, str> {
    if s.contains('"') {
        Cow::Owned(s.replace('"', "&quot;"))
    } else {
        Cow::Borrowed(s)
    }
}

/// Void elements never have content or an end tag.
pub fn is_void_element(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Raw text elements: content ends only at the matching end tag.
pub fn is_raw_text_element(tag: &str) -> bool {
    matches!(tag, "script" | "style")
}

/// Elements whose text content is kept byte-for-byte.
pub fn is_whitespace_preserving(tag: &str) -> bool {
    matches!(tag, "pre" | "textarea")
}

/// Inline (phrasing) elements: whitespace next to them is visible, so it
/// is collapsed but not removed.
pub fn is_inline_element(tag: &str) -> bool {
    matches!(
        tag,
        "a" | "abbr"
            | "acronym"
            | "b"
            | "bdi"
            | "bdo"
            | "big"
            | "button"
            | "cite"
            | "code"
            | "del"
            | "dfn"
            | "em"
            | "font"
            | "i"
            | "img"
            | "input"
            | "ins"
            | "kbd"
            | "label"
            | "mark"
            | "math"
            | "nobr"
            | "object"
            | "q"
            | "rp"
            | "rt"
            | "rtc"
            | "ruby"
            | "s"
            | "samp"
            | "select"
            | "small"
            | "span"
            | "strike"
            | "strong"
            | "sub"
            | "sup"
            | "svg"
            | "textarea"
            | "time"
            | "tt"
            | "u"
            | "var"
            | "wbr"
    )
}

/// Parse the attribute part of a start tag.
///
/// Input: `class="foo" data-x='1' id=main disabled`
/// Output: `[("class", Some("foo")), ("data-x", Some("1")), ("id", Some("main")), ("disabled", None)]`
///
/// Names are returned as written; values have their quotes removed.
pub fn parse_attributes(s: &str) -> Vec<(String, Option<String>)> {
    let mut attrs = Vec::new();
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_whitespace() || c == '/' {
            continue;
        }

        let mut name = String::from(c);
        while let Some(&next) = chars.peek() {
            if next == '=' || next == '/' || next.is_whitespace() {
                break;
            }
            name.push(next);
            chars.next();
        }

        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }

        if chars.peek() != Some(&'=') {
            attrs.push((name, None));
            continue;
        }
        chars.next();

        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }

        let mut value = String::new();
        match chars.peek().copied() {
            Some(quote @ ('"' | '\'')) => {
                chars.next();
                for c in chars.by_ref() {
                    if c == quote {
                        break;
                    }
                    value.push(c);
                }
            }
            _ => {
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() {
                        break;
                    }
                    value.push(c);
                    chars.next();
                }
            }
        }
        attrs.push((name, Some(value)));
    }

    attrs
}

/// Insert `snippet` before the last `</body>`, or append it when absent.
pub fn inject_before_body_end(html: &[u8], snippet: &str) -> Vec<u8> {
    const PATTERN: &[u8] = b"</body>";

    let pos = html
        .windows(PATTERN.len())
        .rposition(|w| w.eq_ignore_ascii_case(PATTERN));

    let mut out = Vec::with_capacity(html.len() + snippet.len());
    match pos {
        Some(pos) => {
            out.extend_from_slice(&html[..pos]);
            out.extend_from_slice(snippet.as_bytes());
            out.extend_from_slice(&html[pos..]);
        }
        None => {
            out.extend_from_slice(html);
            out.extend_from_slice(snippet.as_bytes());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_attr() {
        assert_eq!(escape_attr("plain"), "plain");
        assert_eq!(escape_attr(r#"say "hi""#), "say &quot;hi&quot;");
        assert_eq!(escape_attr("a &amp; b"), "a &amp; b");
    }

    #[test]
    fn test_element_classes() {
        assert!(is_void_element("br"));
        assert!(!is_void_element("div"));
        assert!(is_raw_text_element("script"));
        assert!(!is_raw_text_element("pre"));
        assert!(is_whitespace_preserving("pre"));
        assert!(is_inline_element("span"));
        assert!(!is_inline_element("div"));
        assert!(!is_inline_element("p"));
    }

    #[test]
    fn test_parse_attributes() {
        let attrs = parse_attributes(r#"a="1" b='2' c=3 disabled alt="" /"#);
        assert_eq!(
            attrs,
            vec![
                ("a".to_string(), Some("1".to_string())),
                ("b".to_string(), Some("2".to_string())),
                ("c".to_string(), Some("3".to_string())),
                ("disabled".to_string(), None),
                ("alt".to_string(), Some(String::new())),
            ]
        );
    }

    #[test]
    fn test_parse_attributes_quotes_inside_values() {
        let attrs = parse_attributes(r#"title='a "b" c' data-x = "y""#);
        assert_eq!(attrs[0].1.as_deref(), Some(r#"a "b" c"#));
        assert_eq!(attrs[1], ("data-x".to_string(), Some("y".to_string())));
    }

    #[test]
    fn test_inject_before_body_end() {
        let html = b"<html><body><p>x</p></body></html>";
        let out = inject_before_body_end(html, "<script></script>");
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "<html><body><p>x</p><script></script></body></html>"
        );

        let out = inject_before_body_end(b"<p>x</p>", "<s>");
        assert_eq!(String::from_utf8(out).unwrap(), "<p>x</p><s>");

        let out = inject_before_body_end(b"<BODY>x</BODY>", "!");
        assert_eq!(String::from_utf8(out).unwrap(), "<BODY>x!</BODY>");
    }
}
