//! Development server with live reload.
//!
//! ```text
//! DevServer (stopped) --start()--> ServerHandle (serving) --stop()--> (stopped)
//! ```
//!
//! `start` binds HTTP and the reload WebSocket (each retrying the next ports
//! when taken), starts the reload actor and the watcher, and opens the
//! browser. All running parts are owned by the returned `ServerHandle`.

mod browser;
mod content;
mod lifecycle;
mod path;
mod response;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{Context, Result};
use tiny_http::{Request, Server};
use tokio::sync::mpsc;

use crate::actor::messages::WsMsg;
use crate::actor::watch::SourceWatcher;
use crate::actor::{CHANNEL_BUFFER, ReloadChannel};
use crate::config::ProjectConfig;
use crate::core::ShutdownSignal;
use crate::embed::serve::HOTRELOAD_URL;
use crate::reload::server::{ReloadListener, start_ws_server};
use crate::{debug, log};

/// Worker threads answering HTTP requests.
const REQUEST_THREADS: usize = 4;

/// Dev server, not yet running.
pub struct DevServer {
    config: Arc<ProjectConfig>,
}

/// What request handlers need.
struct ServeState {
    dist: PathBuf,
    ws_port: u16,
}

impl DevServer {
    pub fn new(config: ProjectConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn start(self) -> Result<ServerHandle> {
        let serve = &self.config.serve;
        let dist = self.config.layout().output_dir();
        std::fs::create_dir_all(&dist)
            .with_context(|| format!("failed to create {}", dist.display()))?;

        let (server, addr) = lifecycle::bind_with_retry(serve.interface, serve.port)?;
        let server = Arc::new(server);

        let (ws_tx, ws_rx) = mpsc::channel::<WsMsg>(CHANNEL_BUFFER);
        let channel = ReloadChannel::new(ws_tx.clone());

        // From here on, a failure drops the handle, which stops what already runs
        let mut handle = ServerHandle {
            addr,
            server: Arc::clone(&server),
            channel: channel.clone(),
            actor_thread: Some(lifecycle::spawn_reload_actor(ws_rx)?),
            http_thread: None,
            listener: None,
            watcher: None,
        };

        let listener = start_ws_server(serve.interface, serve.reload_port, ws_tx)?;
        let ws_port = listener.port;
        handle.listener = Some(listener);
        debug!("reload"; "ws://{}:{}", serve.interface, ws_port);

        handle.watcher = Some(SourceWatcher::start(Arc::clone(&self.config), channel)?);

        let state = Arc::new(ServeState { dist, ws_port });
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(REQUEST_THREADS)
            .thread_name(|i| format!("kiln-http-{i}"))
            .build()
            .context("failed to create request pool")?;
        handle.http_thread = Some(
            std::thread::Builder::new()
                .name("kiln-http".into())
                .spawn(move || run_request_loop(&server, &pool, &state))
                .context("failed to spawn http thread")?,
        );

        let url = format!("http://{addr}");
        log!("serve"; "{}", url);
        if serve.open {
            browser::open(&url);
        }
        Ok(handle)
    }
}

/// Running dev server.
pub struct ServerHandle {
    addr: SocketAddr,
    server: Arc<Server>,
    channel: ReloadChannel,
    actor_thread: Option<JoinHandle<()>>,
    http_thread: Option<JoinHandle<()>>,
    listener: Option<ReloadListener>,
    watcher: Option<SourceWatcher>,
}

impl ServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Block until Ctrl+C, then stop.
    pub fn wait(mut self, signal: &ShutdownSignal) {
        signal.wait();
        self.stop();
    }

    /// Stop watching, unblock HTTP, shut down the reload actor and join
    /// every thread. Idempotent.
    pub fn stop(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            watcher.stop();
        }

        self.server.unblock();
        if let Some(thread) = self.http_thread.take() {
            let _ = thread.join();
        }

        if let Some(mut listener) = self.listener.take() {
            listener.stop();
        }

        if let Some(thread) = self.actor_thread.take() {
            self.channel.shutdown();
            let _ = thread.join();
            debug!("serve"; "stopped http://{}", self.addr);
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_request_loop(server: &Server, pool: &rayon::ThreadPool, state: &Arc<ServeState>) {
    for request in server.incoming_requests() {
        let state = Arc::clone(state);
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &state) {
                log!("serve"; "request error: {e}");
            }
        });
    }
}

fn handle_request(request: Request, state: &ServeState) -> Result<()> {
    debug!("serve"; "{} {}", request.method(), request.url());

    if request.url() == HOTRELOAD_URL {
        return response::respond_hotreload_js(request, state.ws_port);
    }

    match path::resolve_path(request.url(), &state.dist) {
        Some(file) => response::respond_file(request, &file),
        None => response::respond_not_found(request, &state.dist),
    }
}
