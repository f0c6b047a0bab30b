//! WebSocket actor.
//!
//! Owns the client list and broadcasts reload protocol frames:
//!
//! ```text
//! WsMsg --> WsActor --[broadcast]--> clients
//! ```
//!
//! The last error is remembered and replayed to clients connecting later,
//! so a page opened while a stage is broken still shows the overlay.

mod client_io;
mod delivery;

use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tungstenite::WebSocket;

use super::messages::WsMsg;
use crate::reload::message::ReloadMessage;

type Clients = Arc<Mutex<Vec<WebSocket<TcpStream>>>>;

/// WebSocket actor: manages client connections and broadcasts
pub struct WsActor {
    rx: mpsc::Receiver<WsMsg>,
    clients: Clients,
    /// Error overlay sent to new clients
    pending_error: Mutex<Option<ReloadMessage>>,
    /// Cleared on shutdown; stops the reader thread
    running: Arc<AtomicBool>,
}

impl WsActor {
    pub fn new(rx: mpsc::Receiver<WsMsg>) -> Self {
        Self {
            rx,
            clients: Arc::new(Mutex::new(Vec::new())),
            pending_error: Mutex::new(None),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Run the actor event loop until `Shutdown` or all senders are gone.
    pub async fn run(mut self) {
        let clients = Arc::clone(&self.clients);
        let running = Arc::clone(&self.running);
        let reader = std::thread::spawn(move || Self::client_reader_loop(&clients, &running));

        while let Some(msg) = self.rx.recv().await {
            match msg {
                WsMsg::Reload { reason } => {
                    crate::debug!("ws"; "sending reload: {}", reason);
                    self.broadcast(&ReloadMessage::reload(reason));
                }

                WsMsg::Css { paths } => {
                    crate::debug!("ws"; "sending css: {}", paths.join(", "));
                    self.broadcast(&ReloadMessage::Css { paths });
                }

                WsMsg::Error { stage, message } => {
                    let msg = ReloadMessage::Error { stage, message };
                    self.broadcast(&msg);
                    *self.pending_error.lock() = Some(msg);
                }

                WsMsg::ClearError => {
                    *self.pending_error.lock() = None;
                    self.broadcast(&ReloadMessage::ClearError);
                }

                WsMsg::AddClient(stream) => self.add_client(stream),

                WsMsg::Shutdown => break,
            }
        }

        crate::debug!("ws"; "shutting down");
        self.running.store(false, Ordering::SeqCst);
        for mut ws in self.clients.lock().drain(..) {
            let _ = ws.close(None);
            let _ = ws.flush();
        }
        let _ = reader.join();
    }
}
