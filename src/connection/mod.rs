//! Connection Management Module
//!
//! Owns the live sockets of the room: the listening socket plus every
//! accepted peer, in insertion order.

pub mod set;

pub use set::{Connection, ConnectionSet, Endpoint};
