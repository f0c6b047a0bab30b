//! Shared helpers: filesystem walking, HTML classification, MIME types.

pub mod fs;
pub mod html;
pub mod mime;
