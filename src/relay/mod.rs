//! Broadcast Relay Module
//!
//! The room server: a single-task event loop multiplexing every live socket
//! through one readiness wait, and the fan-out policy that delivers a
//! sender's payload to all other peers.

pub mod broadcast;
pub mod server;

pub use broadcast::broadcast;
pub use server::ChatServer;
