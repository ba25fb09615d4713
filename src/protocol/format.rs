//! Room Message Formats
//!
//! The canonical user-visible strings broadcast by the server. These exact
//! byte sequences are the interoperability contract with existing clients,
//! so they are built here from a peer's address and nowhere else.

use std::net::SocketAddr;

use bytes::{BufMut, Bytes, BytesMut};

/// Display form of a peer address, `(<host>, <port>)`
pub fn peer_label(addr: &SocketAddr) -> String {
    format!("({}, {})", addr.ip(), addr.port())
}

/// Notice broadcast when a new peer joins the room
pub fn enter_notice(addr: &SocketAddr) -> String {
    format!("\n[{}:{}] entered the room\n", addr.ip(), addr.port())
}

/// Notice broadcast when a peer disconnects
pub fn offline_notice(addr: &SocketAddr) -> String {
    format!("\nClient {} is offline\n", peer_label(addr))
}

/// Relayed user text: `\r<(<host>, <port>)> ` followed by the verbatim payload
pub fn relay_line(addr: &SocketAddr, payload: &[u8]) -> Bytes {
    let header = format!("\r<{}> ", peer_label(addr));
    let mut line = BytesMut::with_capacity(header.len() + payload.len());
    line.put_slice(header.as_bytes());
    line.put_slice(payload);
    line.freeze()
}
