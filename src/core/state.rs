//! Process shutdown signalling.
//!
//! Ctrl+C is translated into a message on a channel instead of a global flag,
//! so whoever owns a running server decides how to stop it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use crossbeam::channel::{self, Receiver};

/// Ctrl+C signal, handed to the code that blocks on a running server.
pub struct ShutdownSignal {
    rx: Receiver<()>,
    waiting: Arc<AtomicBool>,
}

impl ShutdownSignal {
    /// Block until Ctrl+C is pressed.
    pub fn wait(&self) {
        self.waiting.store(true, Ordering::SeqCst);
        let _ = self.rx.recv();
    }
}

/// Install the Ctrl+C handler. Call once at program start.
///
/// While nobody waits on the signal (e.g. during a one-shot build), Ctrl+C
/// exits the process immediately. A second Ctrl+C always exits.
pub fn setup_shutdown_handler() -> Result<ShutdownSignal> {
    let (tx, rx) = channel::bounded::<()>(1);
    let waiting = Arc::new(AtomicBool::new(false));
    let handler_waiting = Arc::clone(&waiting);

    ctrlc::set_handler(move || {
        if !handler_waiting.load(Ordering::SeqCst) || tx.try_send(()).is_err() {
            std::process::exit(130);
        }
        crate::log!("serve"; "shutting down...");
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))?;

    Ok(ShutdownSignal { rx, waiting })
}
