//! Server lifecycle module
//!
//! Owns the listening socket through an accept-loop task and provides
//! awaitable start/stop:
//! - `start()` resolves once the socket is actively listening
//! - `stop()` closes the listener and waits for in-flight connections to
//!   drain before returning

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use super::connection::accept_connection;
use super::listener::create_listener;
use crate::config::{AppState, Config};
use crate::logger;

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// HTTP server with graceful start/stop.
///
/// The listening socket is exclusively owned by the accept task; dropping
/// it on shutdown releases the port before `stop()` returns. Instances
/// are fully independent, so tests can run several side by side on
/// ephemeral ports.
pub struct HttpServer {
    state: Arc<AppState>,
    active_connections: Arc<AtomicUsize>,
    local_addr: Option<SocketAddr>,
    shutdown: Option<watch::Sender<bool>>,
    accept_task: Option<JoinHandle<()>>,
}

impl HttpServer {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            state: Arc::new(AppState::new(config)),
            active_connections: Arc::new(AtomicUsize::new(0)),
            local_addr: None,
            shutdown: None,
            accept_task: None,
        }
    }

    /// Bind the configured address and begin accepting connections.
    ///
    /// Resolves only after the socket is listening. Bind failure (port in
    /// use, permission denied) is fatal and propagated. Calling `start()`
    /// on a running server is a no-op.
    pub async fn start(&mut self) -> std::io::Result<()> {
        if self.accept_task.is_some() {
            return Ok(());
        }

        let addr = self
            .state
            .config
            .socket_addr()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        let (ready_tx, ready_rx) = oneshot::channel();
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let state = Arc::clone(&self.state);
        let active_connections = Arc::clone(&self.active_connections);

        let accept_task = tokio::spawn(async move {
            let listener = match create_listener(addr) {
                Ok(listener) => listener,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let local_addr = match listener.local_addr() {
                Ok(local_addr) => local_addr,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(local_addr));

            loop {
                tokio::select! {
                    accept_result = listener.accept() => match accept_result {
                        Ok((stream, peer_addr)) => {
                            accept_connection(stream, peer_addr, &state, &active_connections);
                        }
                        Err(e) => {
                            logger::log_error(&format!("Failed to accept connection: {e}"));
                        }
                    },
                    _ = shutdown_rx.changed() => break,
                }
            }
            // Listener is dropped here, releasing the port
        });

        match ready_rx.await {
            Ok(Ok(local_addr)) => {
                self.local_addr = Some(local_addr);
                self.shutdown = Some(shutdown_tx);
                self.accept_task = Some(accept_task);
                logger::log_server_start(&local_addr, &self.state.config);
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "Accept task terminated before startup completed",
            )),
        }
    }

    /// Stop accepting connections and wait for in-flight connections to
    /// drain.
    ///
    /// Returns immediately when the server was never started or is
    /// already stopped.
    pub async fn stop(&mut self) {
        let Some(shutdown) = self.shutdown.take() else {
            return;
        };
        let _ = shutdown.send(true);

        if let Some(accept_task) = self.accept_task.take() {
            if accept_task.await.is_err() {
                logger::log_error("Accept task panicked during shutdown");
            }
        }

        while self.active_connections.load(Ordering::SeqCst) > 0 {
            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        }

        self.local_addr = None;
        logger::log_server_stop();
    }

    /// Bound address of the listening socket, for composition with test
    /// harnesses and signal glue. `None` when stopped.
    #[must_use]
    pub const fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Whether the accept loop is live
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.accept_task.is_some()
    }

    /// Number of connections currently being served
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::SeqCst)
    }
}
