//! RustRelay Library
//!
//! A TCP chat relay built around a single cooperative event loop: the server
//! multiplexes every live socket through one readiness wait and fans messages
//! out to all other participants, and the client multiplexes local input
//! against the server socket with the same discipline.

pub mod client;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod relay;
pub mod shutdown;

pub use client::ChatClient;
pub use config::Config;
pub use connection::ConnectionSet;
pub use relay::ChatServer;
pub use shutdown::ShutdownSignal;

/// Common error type for the relay
pub type Result<T> = anyhow::Result<T>;
