//! Chat Protocol Constants

use std::time::Duration;

// Every message on the wire is preceded by its payload length as a
// 4-byte unsigned big-endian integer
pub const LEN_PREFIX_SIZE: usize = 4;

// Default address the room binds to and clients connect to
pub const DEFAULT_ADDR: &str = "127.0.0.1:10000";

// Receive buffer / frame chunk size
pub const DEFAULT_RECV_BUFFER: usize = 4096;

// Pending (not yet accepted) inbound connections beyond this are refused
// by the transport layer
pub const DEFAULT_LISTEN_BACKLOG: u32 = 10;

// Readiness waits re-enter the loop after this long with no ready socket
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(60);

// Client connect attempts are abandoned after this long
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
