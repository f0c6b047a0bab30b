//! Server lifecycle: binding and background runtimes.

use std::net::{IpAddr, SocketAddr};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use tiny_http::Server;
use tokio::sync::mpsc;

use crate::actor::messages::WsMsg;
use crate::actor::ws::WsActor;
use crate::log;
use crate::reload::server::MAX_PORT_RETRIES;

/// Bind to the specified interface and port, with automatic port retry.
pub fn bind_with_retry(interface: IpAddr, base_port: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = String::new();

    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                // port 0 asks the OS for one
                let addr = server.server_addr().to_ip().unwrap_or(addr);
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, addr.port());
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = e.to_string(),
        }
    }

    Err(anyhow::anyhow!(
        "failed to bind after {} attempts (ports {}-{}): {}",
        MAX_PORT_RETRIES,
        base_port,
        base_port.saturating_add(MAX_PORT_RETRIES - 1),
        last_error
    ))
}

/// Run the `WsActor` on a two-worker runtime in its own thread.
///
/// The thread ends once the actor receives `Shutdown` or every sender is gone.
pub fn spawn_reload_actor(rx: mpsc::Receiver<WsMsg>) -> Result<JoinHandle<()>> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    thread::Builder::new()
        .name("kiln-reload".into())
        .spawn(move || rt.block_on(WsActor::new(rx).run()))
        .context("failed to spawn reload thread")
}
