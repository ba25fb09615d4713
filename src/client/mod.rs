//! Chat Client Module
//!
//! The interactive client session: one task owning the server socket,
//! multiplexing it against a local input stream.

pub mod session;

pub use session::ChatClient;
