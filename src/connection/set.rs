//! Connection Set
//!
//! The authoritative, insertion-ordered collection of live sockets. Entry 0
//! is always the listener, created at startup and never removed until the
//! set itself is dropped; peers are added only on a successful accept and
//! removed only by eviction. The set is owned by a single event-loop task
//! and mutated only on that task's call stack, so it needs no locking.

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};

/// A tracked socket: either the room's listener or an accepted peer
#[derive(Debug)]
pub enum Endpoint {
    Listener(TcpListener),
    Peer(TcpStream),
}

/// One live socket together with its address
#[derive(Debug)]
pub struct Connection {
    addr: SocketAddr,
    endpoint: Endpoint,
}

impl Connection {
    /// Wrap an accepted peer stream
    pub fn peer(stream: TcpStream, addr: SocketAddr) -> Self {
        Self {
            addr,
            endpoint: Endpoint::Peer(stream),
        }
    }

    /// The socket's peer address (local address for the listener)
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn endpoint_mut(&mut self) -> &mut Endpoint {
        &mut self.endpoint
    }

    pub fn is_listener(&self) -> bool {
        matches!(self.endpoint, Endpoint::Listener(_))
    }
}

/// Insertion-ordered set of live connections
#[derive(Debug)]
pub struct ConnectionSet {
    entries: Vec<Connection>,
}

impl ConnectionSet {
    /// Create a set around a bound listener
    pub fn new(listener: TcpListener, local_addr: SocketAddr) -> Self {
        Self {
            entries: vec![Connection {
                addr: local_addr,
                endpoint: Endpoint::Listener(listener),
            }],
        }
    }

    /// Add an accepted peer connection
    pub fn add(&mut self, connection: Connection) {
        debug_assert!(
            !self.entries.iter().any(|c| c.addr == connection.addr),
            "duplicate connection for {}",
            connection.addr
        );
        self.entries.push(connection);
    }

    /// Evict a peer, handing its socket back to the caller.
    ///
    /// The listener cannot be removed this way.
    pub fn remove(&mut self, addr: SocketAddr) -> Option<Connection> {
        let index = self
            .entries
            .iter()
            .position(|c| !c.is_listener() && c.addr == addr)?;
        Some(self.entries.remove(index))
    }

    /// All tracked connections in insertion order, listener first
    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Connection> {
        self.entries.iter_mut()
    }

    /// Whether the given address belongs to the listener entry
    pub fn is_listener(&self, addr: SocketAddr) -> bool {
        self.entries
            .iter()
            .any(|c| c.is_listener() && c.addr == addr)
    }

    /// Mutable access to one peer's stream
    pub fn peer_mut(&mut self, addr: SocketAddr) -> Option<&mut TcpStream> {
        self.entries
            .iter_mut()
            .find(|c| !c.is_listener() && c.addr == addr)
            .and_then(|c| match c.endpoint_mut() {
                Endpoint::Peer(stream) => Some(stream),
                Endpoint::Listener(_) => None,
            })
    }

    /// Number of connected peers (the listener is not counted)
    pub fn peer_count(&self) -> usize {
        self.entries.iter().filter(|c| !c.is_listener()).count()
    }

    /// The listener's bound address
    pub fn local_addr(&self) -> SocketAddr {
        self.entries[0].addr
    }
}
