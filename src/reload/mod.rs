//! Live reload.
//!
//! ```text
//! watcher / reporter --WsMsg--> WsActor --JSON frames--> browsers
//!                                  ^
//!              server (accept) ----+
//! ```
//!
//! - `message` - wire protocol (connected, reload, css, error, clear_error)
//! - `server` - WebSocket accept loop

pub mod message;
pub mod server;
