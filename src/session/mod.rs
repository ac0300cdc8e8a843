//! Per-connection control surface.
//!
//! A [`Session`] is the handle application code holds for one WebSocket
//! connection: send a value, close, query the peer address, adjust the idle
//! timeout. Sessions are cheap to clone; every clone observes closure the
//! moment the bridge shuts the connection down.

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::encode::{EncodeError, Encoder, Payload, WireAction};
use crate::wire::{NativeSocket, SocketError};

/// Errors reported by [`Session`] operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The connection's channels have been closed; no further writes are
    /// possible.
    #[error("send on closed session")]
    Closed,

    /// The session has no recorded peer address. Not reachable in the normal
    /// flow, since sessions are only exposed after connect.
    #[error("session is not connected")]
    NotConnected,

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("socket write failed: {0}")]
    Socket(#[from] SocketError),
}

struct Inner {
    socket: Mutex<Box<dyn NativeSocket>>,
    encoder: Arc<Encoder>,
    peer: Option<SocketAddr>,
    closed: AtomicBool,
}

/// The per-connection handle exposed to application code.
///
/// Owned by the bridge for the connection's lifetime and shared by clone with
/// handlers and control events. Operations after shutdown fail with
/// [`SessionError::Closed`] rather than blocking or panicking.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl Session {
    pub(crate) fn new(socket: Box<dyn NativeSocket>, encoder: Arc<Encoder>) -> Self {
        let peer = socket.peer_addr();
        Self {
            inner: Arc::new(Inner {
                socket: Mutex::new(socket),
                encoder,
                peer,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Encodes `payload` and writes it to the connection.
    ///
    /// Accepts anything convertible into a [`Payload`]: byte buffers, text,
    /// frames, writer closures, or registry-dispatched values.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Closed`] once the connection has shut down.
    /// - [`SessionError::Encode`] if a registered encoder rejects the value.
    /// - [`SessionError::Socket`] if the native write fails.
    pub fn send(&self, payload: impl Into<Payload>) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }
        let action = self.inner.encoder.encode(payload.into())?;
        let mut socket = self.lock_socket();
        match action {
            WireAction::Message(message) => socket.write(message)?,
            WireAction::Direct(write) => socket.write_with(write)?,
        }
        Ok(())
    }

    /// Requests native connection closure. Idempotent: a no-op once the
    /// connection has already shut down.
    pub fn close(&self) -> Result<(), SessionError> {
        if self.is_closed() {
            return Ok(());
        }
        debug!(peer = ?self.inner.peer, "closing websocket session");
        self.lock_socket().close()?;
        Ok(())
    }

    /// The peer address recorded when the connection was accepted.
    pub fn remote_address(&self) -> Result<SocketAddr, SessionError> {
        self.inner.peer.ok_or(SessionError::NotConnected)
    }

    /// Forwards a new idle timeout to the native connection. Affects only
    /// future idle evaluation.
    pub fn set_idle_timeout(&self, timeout: Duration) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }
        self.lock_socket().set_idle_timeout(timeout)?;
        Ok(())
    }

    /// Returns `true` once the bridge has shut this connection down.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Marks the session closed. Returns `true` for the caller that performed
    /// the transition — the single shutdown guard shared with the bridge.
    pub(crate) fn mark_closed(&self) -> bool {
        !self.inner.closed.swap(true, Ordering::AcqRel)
    }

    fn lock_socket(&self) -> std::sync::MutexGuard<'_, Box<dyn NativeSocket>> {
        self.inner
            .socket
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("peer", &self.inner.peer)
            .field("closed", &self.is_closed())
            .finish()
    }
}
