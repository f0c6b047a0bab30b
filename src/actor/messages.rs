//! Actor message definitions.
//!
//! ```text
//! watch dispatcher / reporter --WsMsg--> WsActor
//! reload server ----AddClient----------> WsActor
//! ```

use std::net::TcpStream;

/// Messages to the WebSocket actor
pub enum WsMsg {
    /// Reload every client
    Reload { reason: String },
    /// Swap stylesheets in place
    Css { paths: Vec<String> },
    /// Show the error overlay (also sent to clients connecting later)
    Error { stage: String, message: String },
    /// Hide the error overlay
    ClearError,
    /// Newly accepted connection, before the WebSocket handshake
    AddClient(TcpStream),
    /// Close all clients and stop
    Shutdown,
}
