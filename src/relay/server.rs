//! Chat Room Server
//!
//! A single cooperative task owns every socket in the room. Each loop
//! iteration performs one readiness wait across the whole connection set
//! (accept readiness on the listener, read readiness on every peer), raced
//! against the idle timeout and the shutdown wakeup, then dispatches the one
//! ready operation. No per-connection task is spawned, so the set is
//! mutated only on this task's call stack.

use std::future::poll_fn;
use std::io;
use std::net::SocketAddr;
use std::task::Poll;

use anyhow::{anyhow, Context};
use tokio::net::{TcpSocket, TcpStream};
use tokio::time;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::connection::{Connection, ConnectionSet, Endpoint};
use crate::protocol::{codec, format};
use crate::relay::broadcast;
use crate::shutdown::ShutdownSignal;
use crate::Result;

/// One readiness-wait outcome
enum Event {
    Stop,
    Idle,
    Accepted(io::Result<(TcpStream, SocketAddr)>),
    PeerReady(SocketAddr),
}

/// The chat relay server
pub struct ChatServer {
    config: ServerConfig,
    connections: Option<ConnectionSet>,
    shutdown: ShutdownSignal,
}

impl ChatServer {
    /// Create a server for the given configuration. Nothing is bound until
    /// [`bind`](Self::bind) or [`start`](Self::start) is called.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            connections: None,
            shutdown: ShutdownSignal::new(),
        }
    }

    /// A handle that stops the server loop when triggered
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Request the server loop to stop. Safe to call more than once.
    pub fn stop(&self) {
        self.shutdown.stop();
    }

    /// The listener's bound address, once bound
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.connections.as_ref().map(|c| c.local_addr())
    }

    /// Bind the listening socket and return its address.
    ///
    /// Binding with port 0 picks an ephemeral port; the returned address
    /// carries the real one.
    pub async fn bind(&mut self) -> Result<SocketAddr> {
        let bind_addr = self.config.bind_addr;
        let socket = match bind_addr {
            SocketAddr::V4(_) => TcpSocket::new_v4()?,
            SocketAddr::V6(_) => TcpSocket::new_v6()?,
        };
        socket.set_reuseaddr(true)?;
        socket
            .bind(bind_addr)
            .with_context(|| format!("Failed to bind to {}", bind_addr))?;
        let listener = socket
            .listen(self.config.listen_backlog)
            .with_context(|| format!("Failed to listen on {}", bind_addr))?;
        let local_addr = listener.local_addr()?;

        info!("Chat room listening on {}", local_addr);
        self.connections = Some(ConnectionSet::new(listener, local_addr));
        Ok(local_addr)
    }

    /// Bind and run until stopped (blocking)
    pub async fn start(&mut self) -> Result<()> {
        self.bind().await?;
        self.run().await
    }

    /// Run the event loop until stopped. Requires a prior bind.
    ///
    /// On exit every tracked socket is closed.
    pub async fn run(&mut self) -> Result<()> {
        let mut connections = self
            .connections
            .take()
            .ok_or_else(|| anyhow!("Server not bound"))?;

        while self.shutdown.is_running() {
            let event = tokio::select! {
                _ = self.shutdown.stopped() => Event::Stop,
                _ = time::sleep(self.config.poll_timeout) => Event::Idle,
                event = next_ready(&connections) => event,
            };

            match event {
                Event::Stop => break,
                Event::Idle => continue,
                Event::Accepted(Ok((stream, peer_addr))) => {
                    self.handle_join(&mut connections, stream, peer_addr).await;
                }
                Event::Accepted(Err(e)) => {
                    // Non-fatal: skip the listener for this iteration
                    warn!("Failed to accept connection: {}", e);
                }
                Event::PeerReady(peer_addr) => {
                    self.handle_peer_ready(&mut connections, peer_addr).await;
                }
            }
        }

        info!(
            "Chat room on {} closing, dropping {} peer(s)",
            connections.local_addr(),
            connections.peer_count()
        );
        Ok(())
    }

    /// Register an accepted peer and announce it to the room
    async fn handle_join(
        &self,
        connections: &mut ConnectionSet,
        stream: TcpStream,
        peer_addr: SocketAddr,
    ) {
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Failed to set TCP_NODELAY for {}: {}", peer_addr, e);
        }
        connections.add(Connection::peer(stream, peer_addr));
        info!("Client {} connected", format::peer_label(&peer_addr));

        // The new peer is the excluded sender, so the notice reaches only
        // the peers that were already in the room
        let notice = format::enter_notice(&peer_addr);
        broadcast(connections, peer_addr, notice.as_bytes()).await;
    }

    /// Read one frame from a ready peer and relay it, or evict the peer on
    /// a failed or empty read
    async fn handle_peer_ready(&self, connections: &mut ConnectionSet, peer_addr: SocketAddr) {
        let received = match connections.peer_mut(peer_addr) {
            Some(stream) => codec::read_frame(stream, self.config.recv_buffer_size).await,
            None => return,
        };

        match received {
            Ok(Some(payload)) => {
                let line = format::relay_line(&peer_addr, &payload);
                broadcast(connections, peer_addr, &line).await;
            }
            Ok(None) | Err(_) => {
                info!("Client {} is offline", format::peer_label(&peer_addr));

                // The departing peer is the excluded sender; evicting it
                // afterwards closes its socket
                let notice = format::offline_notice(&peer_addr);
                broadcast(connections, peer_addr, notice.as_bytes()).await;
                connections.remove(peer_addr);
            }
        }
    }
}

/// Readiness wait over the whole connection set.
///
/// Resolves with the first ready operation found in insertion order. A
/// peer whose readiness poll reports an error is dispatched as ready; the
/// subsequent read surfaces the error and takes the eviction path, so a
/// transient multiplexing error never tears down the loop.
async fn next_ready(connections: &ConnectionSet) -> Event {
    poll_fn(|cx| {
        for connection in connections.iter() {
            match connection.endpoint() {
                Endpoint::Listener(listener) => {
                    if let Poll::Ready(result) = listener.poll_accept(cx) {
                        return Poll::Ready(Event::Accepted(result));
                    }
                }
                Endpoint::Peer(stream) => {
                    if stream.poll_read_ready(cx).is_ready() {
                        return Poll::Ready(Event::PeerReady(connection.addr()));
                    }
                }
            }
        }
        Poll::Pending
    })
    .await
}
