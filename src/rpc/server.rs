//! # RPC Server
//!
//! Serves a [`Registry`] over TCP from a dedicated background thread.
//!
//! ## Architecture
//!
//! ```text
//! owner thread                      rpc-server-<port> thread
//! ─────────────                     ─────────────────────────
//! RpcServer::start ──spawn──────▶   current-thread tokio runtime
//!        ◀──── bound address ─────   TcpListener::bind
//!                                   accept loop ──▶ handle_connection (task)
//!                                                    └─▶ spawn_blocking(handler)
//! RpcServer::stop ──shutdown──────▶ loop exits, runtime shut down
//!        ◀──── join ──────────────
//! ```
//!
//! Handlers run on the blocking pool so one slow handler (for example the
//! image server's first-read wait) never stalls the accept loop.

use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use super::registry::{Export, Registry};
use crate::common::connection::Connection;
use crate::common::messages::{Message, Payload};
use crate::error::RpcError;

/// How long shutdown waits for in-flight handlers before detaching them.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Handle to a running RPC server thread.
///
/// The thread lives until [`RpcServer::stop`] is called or the handle is
/// dropped.
pub struct RpcServer {
    registry: Registry,
    local_addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl RpcServer {
    /// Bind `0.0.0.0:port` and start serving `registry` on a new thread.
    ///
    /// Port 0 picks any free port; see [`RpcServer::local_addr`]. Returns
    /// only once the listener is bound, so bind failures surface here.
    ///
    /// # Example
    /// ```ignore
    /// let registry = Registry::new();
    /// registry.export(&image_server);
    /// let server = RpcServer::start(61616, registry)?;
    /// ```
    pub fn start(port: u16, registry: Registry) -> Result<Self, RpcError> {
        let (ready_tx, ready_rx) = std_mpsc::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let thread_registry = registry.clone();

        let thread = std::thread::Builder::new()
            .name(format!("rpc-server-{}", port))
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                runtime.block_on(serve(port, thread_registry, ready_tx, shutdown_rx));
                runtime.shutdown_timeout(SHUTDOWN_GRACE);
            })?;

        let bound = ready_rx
            .recv()
            .unwrap_or_else(|_| Err("server thread exited during startup".to_string()));
        match bound {
            Ok(local_addr) => Ok(Self {
                registry,
                local_addr,
                shutdown_tx: Some(shutdown_tx),
                thread: Some(thread),
            }),
            Err(reason) => {
                let _ = thread.join();
                Err(RpcError::ServerStart { port, reason })
            }
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Make `object`'s methods callable on this server.
    pub fn export<E: Export>(&self, object: &E) {
        self.registry.export(object);
    }

    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }

    /// Signal the server thread and wait for it to exit. Idempotent.
    pub fn stop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("RPC server thread on {} panicked", self.local_addr);
            }
            info!("RPC server on {} stopped", self.local_addr);
        }
    }
}

impl Drop for RpcServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn serve(
    port: u16,
    registry: Registry,
    ready_tx: std_mpsc::Sender<Result<SocketAddr, String>>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let listener = match TcpListener::bind(("0.0.0.0", port)).await {
        Ok(listener) => listener,
        Err(e) => {
            let _ = ready_tx.send(Err(e.to_string()));
            return;
        }
    };
    let local_addr = match listener.local_addr() {
        Ok(addr) => addr,
        Err(e) => {
            let _ = ready_tx.send(Err(e.to_string()));
            return;
        }
    };
    let _ = ready_tx.send(Ok(local_addr));
    info!("RPC server listening on {}", local_addr);

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => break,
            accepted = listener.accept() => match accepted {
                Ok((socket, peer)) => {
                    debug!("Accepted RPC connection from {}", peer);
                    let registry = registry.clone();
                    tokio::spawn(async move {
                        handle_connection(socket, registry).await;
                    });
                }
                Err(e) => error!("Accept error on {}: {}", local_addr, e),
            }
        }
    }
}

/// Answer calls on one connection until the peer hangs up.
async fn handle_connection(socket: TcpStream, registry: Registry) {
    let mut conn = Connection::new(socket);

    loop {
        let reply = match conn.read_message().await {
            Ok(Some(Message::Call { name, args })) => {
                let registry = registry.clone();
                let call_name = name.clone();
                match tokio::task::spawn_blocking(move || registry.dispatch(&call_name, args)).await
                {
                    Ok(payload) => payload,
                    Err(e) => {
                        error!("Handler for {} failed: {}", name, e);
                        Payload::Error(format!("handler for '{}' failed", name))
                    }
                }
            }
            Ok(Some(other)) => {
                warn!("Ignoring non-call message: {:?}", other);
                Payload::Error("expected a call".to_string())
            }
            Ok(None) => {
                debug!("RPC connection closed");
                break;
            }
            Err(e) => {
                error!("Error reading RPC message: {}", e);
                break;
            }
        };

        if let Err(e) = conn.write_message(&Message::Reply(reply)).await {
            error!("Error writing RPC reply: {}", e);
            break;
        }
    }
}
