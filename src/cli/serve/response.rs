//! HTTP response handlers.

use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use tiny_http::{Header, Method, Request, Response, StatusCode};

use super::content::maybe_inject_hotreload;
use crate::embed::serve::{HOTRELOAD_JS, HotreloadVars};
use crate::utils::mime::{self, types};

/// Respond with a file from the output tree, injecting the reload client
/// into HTML.
pub fn respond_file(request: Request, path: &Path) -> Result<()> {
    let content_type = mime::from_path(path);

    if is_head_request(&request) {
        return send_head(request, 200, content_type);
    }

    let body = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    send_body(request, 200, content_type, maybe_inject_hotreload(body, content_type))
}

/// 404, using `dist/404.html` when present.
pub fn respond_not_found(request: Request, serve_root: &Path) -> Result<()> {
    let custom = serve_root.join("404.html");

    if is_head_request(&request) {
        let content_type = if custom.is_file() { types::HTML } else { types::PLAIN };
        return send_head(request, 404, content_type);
    }

    match fs::read(&custom) {
        Ok(body) => send_body(request, 404, types::HTML, maybe_inject_hotreload(body, types::HTML)),
        Err(_) => send_body(request, 404, types::PLAIN, b"404 Not Found".to_vec()),
    }
}

/// The reload client, bound to the actual WebSocket port.
pub fn respond_hotreload_js(request: Request, ws_port: u16) -> Result<()> {
    let body = HOTRELOAD_JS.render(&HotreloadVars { ws_port });
    send_body(request, 200, types::JAVASCRIPT, body.into_bytes())
}

fn is_head_request(request: &Request) -> bool {
    request.method() == &Method::Head
}

fn send_head(request: Request, status: u16, content_type: &str) -> Result<()> {
    let response = with_headers(Response::empty(StatusCode(status)), content_type);
    request.respond(response)?;
    Ok(())
}

fn send_body(request: Request, status: u16, content_type: &str, body: Vec<u8>) -> Result<()> {
    let response = Response::from_data(body).with_status_code(StatusCode(status));
    request.respond(with_headers(response, content_type))?;
    Ok(())
}

/// Content type, and no caching: outputs change under the browser.
fn with_headers<R: Read>(mut response: Response<R>, content_type: &str) -> Response<R> {
    for (key, value) in [("Content-Type", content_type), ("Cache-Control", "no-store")] {
        if let Ok(header) = Header::from_bytes(key, value) {
            response.add_header(header);
        }
    }
    response
}
