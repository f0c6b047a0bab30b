//! Live reload actors.
//!
//! ```text
//! notify --> SourceWatcher (dispatch thread) --run_stage--> dist/
//!                  |                                          |
//!                  +------------ReloadChannel-----------------+
//!                                   |
//!                                WsActor --> browsers
//! ```
//!
//! - `messages` - message types
//! - `watch` - source/output watcher and stage dispatch
//! - `ws` - WebSocket client list and broadcast

pub mod messages;
pub mod watch;
pub mod ws;

use tokio::sync::mpsc;

use crate::stage::ChangePublisher;
use messages::WsMsg;

/// Capacity of the actor's inbox.
pub const CHANNEL_BUFFER: usize = 64;

/// Sending half of the `WsActor` inbox, for plain threads.
#[derive(Clone)]
pub struct ReloadChannel {
    tx: mpsc::Sender<WsMsg>,
}

impl ReloadChannel {
    pub fn new(tx: mpsc::Sender<WsMsg>) -> Self {
        Self { tx }
    }

    pub fn reload(&self, reason: impl Into<String>) {
        self.send(WsMsg::Reload {
            reason: reason.into(),
        });
    }

    pub fn error(&self, stage: impl Into<String>, message: impl Into<String>) {
        self.send(WsMsg::Error {
            stage: stage.into(),
            message: message.into(),
        });
    }

    pub fn clear_error(&self) {
        self.send(WsMsg::ClearError);
    }

    pub fn shutdown(&self) {
        self.send(WsMsg::Shutdown);
    }

    /// Must not be called from inside the actor's runtime.
    fn send(&self, msg: WsMsg) {
        if self.tx.blocking_send(msg).is_err() {
            crate::debug!("ws"; "actor stopped, message dropped");
        }
    }
}

impl ChangePublisher for ReloadChannel {
    fn css_changed(&self, paths: Vec<String>) {
        self.send(WsMsg::Css { paths });
    }
}
