//! The native connection seam.
//!
//! Everything below the bridge — the TCP/TLS listener, the HTTP/1.1 parser,
//! and the RFC 6455 upgrade handshake — lives behind [`NativeSocket`]. The
//! bridge and session only ever see this trait, so transports can be swapped
//! (or mocked in tests) without touching session logic.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::message::WireMessage;

/// Errors surfaced by a native socket implementation.
#[derive(Debug, Error)]
pub enum SocketError {
    #[error("connection is closed")]
    Closed,

    #[error("I/O failure on websocket transport: {0}")]
    Io(#[from] std::io::Error),

    /// Handshake failure before a session exists. Stays below the bridge;
    /// application channels never observe it.
    #[error("upgrade handshake failed: {0}")]
    Upgrade(String),
}

/// Raw outbound writer handed to [`WriterFn`] payloads.
///
/// Lets a caller perform a custom write sequence (e.g. several partial
/// messages) directly against the connection instead of going through a
/// single encoded [`WireMessage`].
pub trait WireWriter {
    /// Writes one text message.
    fn write_text(&mut self, text: &str) -> Result<(), SocketError>;

    /// Writes one binary message.
    fn write_binary(&mut self, bytes: &[u8]) -> Result<(), SocketError>;
}

/// A one-shot custom write sequence executed against the raw wire writer.
pub type WriterFn = Box<dyn FnOnce(&mut dyn WireWriter) -> Result<(), SocketError> + Send>;

/// One established WebSocket connection, as the transport exposes it.
///
/// The bridge owns the socket exclusively for the connection's lifetime; the
/// transport serializes callback delivery per connection, so implementations
/// do not need internal locking for correctness of the write path.
pub trait NativeSocket: Send {
    /// Writes a complete, already-encoded message.
    fn write(&mut self, message: WireMessage) -> Result<(), SocketError>;

    /// Runs a custom write sequence against the raw writer.
    fn write_with(&mut self, write: WriterFn) -> Result<(), SocketError>;

    /// Requests connection closure. Implementations must tolerate repeated
    /// calls.
    fn close(&mut self) -> Result<(), SocketError>;

    /// The peer address recorded at accept time, if known.
    fn peer_addr(&self) -> Option<SocketAddr>;

    /// Sets the idle timeout for this connection. Affects only future idle
    /// evaluation; no retroactive effect.
    fn set_idle_timeout(&mut self, timeout: Duration) -> Result<(), SocketError>;
}
