//! The WebSocket session bridge.
//!
//! Native connection APIs are push-based: connect/text/binary/close/error
//! callbacks arrive on transport worker threads. [`Bridge`] re-expresses one
//! connection as three ordered channels — `recv` (inbound messages), `send`
//! (outbound payloads), `ctrl` (lifecycle events) — so a handler can be
//! written as plain sequential loops instead of nested callbacks.
//!
//! The channels are unbounded, matching the conservative reference default:
//! `on_text`/`on_binary` never block the transport thread, and a stalled
//! consumer costs memory rather than liveness. All three channels close
//! together, exactly once, when the connection terminates.
//!
//! The transport serializes callback delivery per connection (`&mut self`
//! here relies on that), but close and error can still both fire around an
//! abrupt disconnect, so the close-all action sits behind a single atomic
//! guard on the session.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::encode::{Encoder, Payload};
use crate::message::{Frame, Inbound};
use crate::session::{Session, SessionError};
use crate::wire::{NativeSocket, SocketError};

/// Receiving half of the inbound message channel.
pub type InboundReceiver = mpsc::UnboundedReceiver<Inbound>;

/// Sending half of the outbound payload channel.
pub type OutboundSender = mpsc::UnboundedSender<Payload>;

/// Receiving half of the control/lifecycle channel.
pub type ControlReceiver = mpsc::UnboundedReceiver<ControlEvent>;

/// Why a connection closed, as reported by the native transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReason {
    /// WebSocket close status code.
    pub code: u16,
    /// Close reason text, possibly empty.
    pub reason: String,
}

/// A lifecycle event on the `ctrl` channel.
///
/// Exactly one `Connected` precedes any `recv` item, and exactly one terminal
/// event (`Closed` or `Error`) is ever published per connection.
#[derive(Debug, Clone)]
pub enum ControlEvent {
    /// The connection is established and the session is live.
    Connected { session: Session },
    /// The connection closed normally.
    Closed {
        session: Session,
        reason: CloseReason,
    },
    /// The connection failed. The application decides whether this is fatal;
    /// the channels are closed either way.
    Error {
        session: Session,
        cause: Arc<SocketError>,
    },
}

/// A per-path WebSocket handler, invoked once per established connection.
///
/// The handler runs synchronously inside `on_connect` and must hand off to
/// background tasks immediately — typically one consumer loop per channel.
pub trait SessionHandler: Send + Sync {
    fn on_session(
        &self,
        session: Session,
        recv: InboundReceiver,
        send: OutboundSender,
        ctrl: ControlReceiver,
    );
}

impl<F> SessionHandler for F
where
    F: Fn(Session, InboundReceiver, OutboundSender, ControlReceiver) + Send + Sync,
{
    fn on_session(
        &self,
        session: Session,
        recv: InboundReceiver,
        send: OutboundSender,
        ctrl: ControlReceiver,
    ) {
        self(session, recv, send, ctrl)
    }
}

struct Conn {
    session: Session,
    recv_tx: mpsc::UnboundedSender<Inbound>,
    ctrl_tx: mpsc::UnboundedSender<ControlEvent>,
    stop: Arc<Notify>,
}

/// Adapter from one native connection's callbacks to channel traffic.
///
/// One bridge serves exactly one connection. The transport's upgrade
/// machinery creates a bridge per accepted connection (see
/// [`BridgeFactory`](crate::server::BridgeFactory)) and delivers its
/// callbacks in order: `on_connect` first, then any number of
/// `on_text`/`on_binary`, then `on_close` or `on_error`.
pub struct Bridge {
    handler: Arc<dyn SessionHandler>,
    encoder: Arc<Encoder>,
    idle_timeout: Duration,
    conn: Option<Conn>,
}

impl Bridge {
    pub fn new(
        handler: Arc<dyn SessionHandler>,
        encoder: Arc<Encoder>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            handler,
            encoder,
            idle_timeout,
            conn: None,
        }
    }

    /// The connection is established: build the session and channels, publish
    /// `Connected`, start the outbound pump, and invoke the handler.
    ///
    /// Must be called on the server's tokio runtime — the outbound pump is
    /// spawned here.
    pub fn on_connect(&mut self, mut socket: Box<dyn NativeSocket>) {
        if self.conn.is_some() {
            warn!("duplicate on_connect for an already-connected bridge — ignoring");
            return;
        }

        if let Err(e) = socket.set_idle_timeout(self.idle_timeout) {
            warn!(error = %e, "failed to apply websocket idle timeout");
        }

        let session = Session::new(socket, Arc::clone(&self.encoder));
        let (recv_tx, recv_rx) = mpsc::unbounded_channel();
        let (send_tx, send_rx) = mpsc::unbounded_channel();
        let (ctrl_tx, ctrl_rx) = mpsc::unbounded_channel();
        let stop = Arc::new(Notify::new());

        let _ = ctrl_tx.send(ControlEvent::Connected {
            session: session.clone(),
        });

        spawn_outbound_pump(session.clone(), send_rx, Arc::clone(&stop));

        self.conn = Some(Conn {
            session: session.clone(),
            recv_tx,
            ctrl_tx,
            stop,
        });

        debug!(peer = ?session.remote_address().ok(), "websocket session established");
        self.handler.on_session(session, recv_rx, send_tx, ctrl_rx);
    }

    /// A complete text message arrived.
    pub fn on_text(&mut self, message: &str) {
        let Some(conn) = &self.conn else { return };
        if conn.recv_tx.send(Inbound::Text(message.to_owned())).is_err() {
            debug!("inbound text after channel shutdown — dropped");
        }
    }

    /// A complete binary message arrived as a window into the transport's
    /// buffer. The slice is copied before this returns; the buffer may be
    /// reused immediately.
    pub fn on_binary(&mut self, buf: &[u8], offset: usize, len: usize) {
        let Some(conn) = &self.conn else { return };
        match Frame::copy_from(buf, offset, len) {
            Ok(frame) => {
                if conn.recv_tx.send(Inbound::Binary(frame)).is_err() {
                    debug!("inbound frame after channel shutdown — dropped");
                }
            }
            Err(e) => warn!(error = %e, "transport delivered an invalid binary window"),
        }
    }

    /// The connection closed normally.
    pub fn on_close(&mut self, code: u16, reason: &str) {
        let reason = CloseReason {
            code,
            reason: reason.to_owned(),
        };
        self.shutdown(|session| ControlEvent::Closed { session, reason });
    }

    /// The connection failed. Before `on_connect`, this is an upgrade failure
    /// and never reaches application channels.
    pub fn on_error(&mut self, cause: SocketError) {
        if self.conn.is_none() {
            debug!(error = %cause, "websocket upgrade failed before a session existed");
            return;
        }
        self.shutdown(|session| ControlEvent::Error {
            session,
            cause: Arc::new(cause),
        });
    }

    /// Publishes the terminal event, then closes all three channels. The
    /// session's closed flag is the single guard: whichever of close/error
    /// observes the transition publishes; the loser's publish targets an
    /// already-closing channel and is a no-op.
    fn shutdown(&mut self, terminal: impl FnOnce(Session) -> ControlEvent) {
        let Some(conn) = self.conn.take() else { return };
        if conn.session.mark_closed() {
            let _ = conn.ctrl_tx.send(terminal(conn.session.clone()));
        }
        conn.stop.notify_one();
        debug!(peer = ?conn.session.remote_address().ok(), "websocket channels closed");
        // recv_tx and ctrl_tx drop here, closing the last two channels; the
        // pump drops the send receiver when it observes the stop signal.
    }
}

/// Drains the outbound channel into the session until shutdown or until the
/// application drops its sender.
fn spawn_outbound_pump(
    session: Session,
    mut send_rx: mpsc::UnboundedReceiver<Payload>,
    stop: Arc<Notify>,
) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = stop.notified() => break,
                item = send_rx.recv() => {
                    let Some(payload) = item else { break };
                    match session.send(payload) {
                        Ok(()) => {}
                        Err(SessionError::Closed) => break,
                        // The pump is the `send` caller here; the failure is
                        // logged rather than lost, and the transport's own
                        // error callback drives channel shutdown.
                        Err(e) => warn!(error = %e, "outbound payload not written"),
                    }
                }
            }
        }
    });
}
