//! # sockline
//!
//! An embeddable async HTTP(S) server core with channel-based WebSocket
//! sessions.
//!
//! The native transport (TCP/TLS listeners, HTTP/1.1 parsing, the RFC 6455
//! handshake) stays behind the [`server::Transport`] trait. This crate owns
//! what sits above it:
//!
//! - the [`bridge`] that turns per-connection push callbacks into three
//!   ordered channels (`recv`, `send`, `ctrl`) a handler consumes with plain
//!   sequential loops;
//! - the [`session::Session`] control surface (send, close, peer address,
//!   idle timeout);
//! - the open [`encode::Encoder`] dispatch deciding how a sent value is
//!   serialized onto the wire;
//! - the exact-path [`registry::WebSocketRegistry`] and the
//!   [`server::ServerBuilder`] that installs everything on a transport.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sockline::bridge::{ControlReceiver, InboundReceiver, OutboundSender};
//! use sockline::http::ResponseMap;
//! use sockline::message::Inbound;
//! use sockline::server::{ServerBuilder, ServerConfig};
//! use sockline::session::Session;
//!
//! fn run(transport: &mut impl sockline::server::Transport) -> Result<(), sockline::server::ServerError> {
//!     ServerBuilder::new(ServerConfig::default())
//!         .handle(|_req| ResponseMap::new(200).body("Hello, World!"))
//!         .websocket(
//!             "/chat",
//!             |_session: Session,
//!              mut recv: InboundReceiver,
//!              send: OutboundSender,
//!              _ctrl: ControlReceiver| {
//!                 // Echo every text message back to the client.
//!                 tokio::spawn(async move {
//!                     while let Some(Inbound::Text(text)) = recv.recv().await {
//!                         let _ = send.send(text.into());
//!                     }
//!                 });
//!             },
//!         )?
//!         .install(transport)
//! }
//! ```

pub mod bridge;
pub mod encode;
pub mod http;
pub mod message;
pub mod registry;
pub mod server;
pub mod session;
pub mod wire;

#[cfg(test)]
pub(crate) mod test_support;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use bridge::{Bridge, ControlEvent, SessionHandler};
pub use encode::{Encoder, Payload};
pub use http::{Headers, RequestMap, ResponseMap};
pub use message::{Frame, Inbound};
pub use server::{ServerBuilder, ServerConfig, ServerError};
pub use session::{Session, SessionError};
