use std::io::ErrorKind;
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tungstenite::protocol::Message;

use crate::reload::message::ReloadMessage;

use super::{Clients, WsActor};

/// Poll interval of the reader thread.
const READ_POLL: Duration = Duration::from_millis(100);

impl WsActor {
    /// Handshake a new connection and register it.
    pub(super) fn add_client(&self, stream: TcpStream) {
        // Blocking during the handshake, non-blocking afterwards for polling reads
        let mut ws = match tungstenite::accept(stream) {
            Ok(ws) => ws,
            Err(e) => {
                crate::log!("ws"; "handshake failed: {}", e);
                return;
            }
        };
        let _ = ws.get_ref().set_nonblocking(true);

        if let Err(e) = ws.send(Message::Text(ReloadMessage::connected().to_json().into())) {
            crate::log!("ws"; "failed to send connected message: {}", e);
            return;
        }

        if let Some(error) = self.pending_error.lock().as_ref()
            && let Err(e) = ws.send(Message::Text(error.to_json().into()))
        {
            crate::debug!("ws"; "failed to send pending error: {}", e);
        }

        let mut clients = self.clients.lock();
        clients.push(ws);
        crate::debug!("ws"; "client connected (total: {})", clients.len());
    }

    /// Drain incoming frames and drop closed clients.
    ///
    /// Clients never send anything meaningful; reading keeps pings answered
    /// and notices disconnects between broadcasts.
    pub(super) fn client_reader_loop(clients: &Clients, running: &AtomicBool) {
        while running.load(Ordering::SeqCst) {
            std::thread::sleep(READ_POLL);

            clients.lock().retain_mut(|ws| match ws.read() {
                Ok(Message::Close(_)) => false,
                Ok(_) => true,
                Err(tungstenite::Error::Io(ref e)) if e.kind() == ErrorKind::WouldBlock => true,
                Err(e) => {
                    crate::debug!("ws"; "client disconnected: {}", e);
                    false
                }
            });
        }
    }
}
