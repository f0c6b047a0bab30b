//! Live reload script injection.

use crate::embed::serve::script_tag;
use crate::utils::html::inject_before_body_end;
use crate::utils::mime;

/// Inject the reload client into HTML responses.
pub fn maybe_inject_hotreload(body: Vec<u8>, content_type: &str) -> Vec<u8> {
    if mime::is_html(content_type) {
        inject_before_body_end(&body, &script_tag())
    } else {
        body
    }
}
