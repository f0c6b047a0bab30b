use tungstenite::protocol::Message;

use crate::reload::message::ReloadMessage;

use super::WsActor;

impl WsActor {
    /// Send a message to all connected clients, dropping dead ones.
    pub(super) fn broadcast(&self, msg: &ReloadMessage) {
        let frame = Message::Text(msg.to_json().into());
        let mut clients = self.clients.lock();

        if clients.is_empty() {
            crate::debug!("ws"; "no clients connected");
            return;
        }

        clients.retain_mut(|ws| match ws.send(frame.clone()) {
            Ok(()) => true,
            Err(e) => {
                crate::debug!("ws"; "client disconnected: {}", e);
                false
            }
        });
        crate::debug!("ws"; "broadcast to {} clients", clients.len());
    }
}
