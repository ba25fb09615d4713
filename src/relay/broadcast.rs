//! Broadcast Fan-Out
//!
//! Delivers one sender's payload to every other peer in the room, in
//! insertion order. A write failure on one peer must not disturb delivery
//! to the rest: the failing peer is evicted and the fan-out continues.
//! Write-failure eviction is also the only way a peer that died between
//! read events gets detected, so no offline notice is sent for it here.

use std::net::SocketAddr;

use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::connection::{ConnectionSet, Endpoint};
use crate::protocol::codec;

/// Write `payload` as one framed message to every peer except the listener
/// and `sender`. Returns the addresses of peers evicted on write failure.
pub async fn broadcast(
    connections: &mut ConnectionSet,
    sender: SocketAddr,
    payload: &[u8],
) -> Vec<SocketAddr> {
    let frame = codec::encode(payload);
    let mut unreachable = Vec::new();

    for connection in connections.iter_mut() {
        if connection.is_listener() || connection.addr() == sender {
            continue;
        }
        let addr = connection.addr();
        let stream = match connection.endpoint_mut() {
            Endpoint::Peer(stream) => stream,
            Endpoint::Listener(_) => continue,
        };
        if let Err(e) = stream.write_all(&frame).await {
            warn!("Write to {} failed, evicting: {}", addr, e);
            unreachable.push(addr);
        }
    }

    for addr in &unreachable {
        // Dropping the connection closes the socket
        if connections.remove(*addr).is_some() {
            debug!("Evicted unreachable peer {}", addr);
        }
    }

    unreachable
}
