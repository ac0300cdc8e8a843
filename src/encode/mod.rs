//! Content-encoding dispatch for outbound values.
//!
//! Anything an application hands to `send` becomes a [`Payload`]. Byte
//! buffers and text resolve directly; a [`WriterFn`] is handed the raw wire
//! writer; any other value travels as [`Payload::Value`] and is resolved
//! through the [`Encoder`] registry by its runtime type, falling back to the
//! value's display form as a text message when no entry matches. The registry
//! is open: new value types register an encode function instead of editing a
//! central conditional.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;

use crate::message::{Frame, WireMessage};
use crate::wire::WriterFn;

/// Errors produced by [`Encoder::encode`].
///
/// Encoding failures surface loudly at the `send` call site rather than
/// being silently swallowed or defaulted.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("registered encoder received a value of the wrong type")]
    TypeMismatch,
}

/// A value the registry can dispatch by runtime type.
///
/// Blanket-implemented for every `Any + Send + Display` type, so any value
/// with a string form is sendable: a registered [`Encoder`] entry decides the
/// wire form when one exists, and the display form goes out as text otherwise.
pub trait SendableValue: Any + Send {
    /// The fallback text representation, used when no entry is registered.
    fn as_text(&self) -> String;

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl<T: Any + Send + Display> SendableValue for T {
    fn as_text(&self) -> String {
        self.to_string()
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

/// A value accepted by `send` — the outbound channel item.
pub enum Payload {
    /// Raw bytes, sent verbatim as a binary message.
    Binary(Bytes),
    /// Text, sent as a UTF-8 text message.
    Text(String),
    /// A custom write sequence, invoked with the raw outbound writer.
    Writer(WriterFn),
    /// Any other value, resolved through the [`Encoder`] registry with a
    /// display-form text fallback.
    Value(Box<dyn SendableValue>),
}

impl Payload {
    /// Wraps a custom write sequence.
    pub fn writer(
        write: impl FnOnce(&mut dyn crate::wire::WireWriter) -> Result<(), crate::wire::SocketError>
        + Send
        + 'static,
    ) -> Self {
        Self::Writer(Box::new(write))
    }

    /// Wraps an arbitrary value for registry-based dispatch.
    pub fn value<T: SendableValue>(value: T) -> Self {
        Self::Value(Box::new(value))
    }

    /// Stringifies a value up front and sends it as text.
    ///
    /// Unlike [`Payload::value`], this skips registry dispatch entirely and
    /// also accepts borrowed values, since the string form is captured here.
    pub fn display(value: impl Display) -> Self {
        Self::Text(value.to_string())
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binary(b) => f.debug_tuple("Binary").field(&b.len()).finish(),
            Self::Text(t) => f.debug_tuple("Text").field(t).finish(),
            Self::Writer(_) => f.write_str("Writer(..)"),
            Self::Value(_) => f.write_str("Value(..)"),
        }
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Self::Binary(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Binary(Bytes::from(bytes))
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Self::Binary(Bytes::copy_from_slice(bytes))
    }
}

impl From<Frame> for Payload {
    fn from(frame: Frame) -> Self {
        Self::Binary(frame.into_bytes())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

/// The wire action an encoded payload resolves to.
pub enum WireAction {
    /// Write this complete message.
    Message(WireMessage),
    /// Run this write sequence against the raw writer.
    Direct(WriterFn),
}

type EncodeFn = Arc<dyn Fn(Box<dyn Any + Send>) -> Result<WireMessage, EncodeError> + Send + Sync>;

/// Open dispatch table from value type to encode function.
///
/// # Examples
///
/// ```
/// use std::fmt;
/// use sockline::encode::{Encoder, Payload};
/// use sockline::message::WireMessage;
///
/// struct Greeting(String);
///
/// impl fmt::Display for Greeting {
///     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
///         write!(f, "{}", self.0)
///     }
/// }
///
/// let mut encoder = Encoder::new();
/// encoder.register(|g: Greeting| WireMessage::Text(format!("hello, {}", g.0)));
///
/// let action = encoder.encode(Payload::value(Greeting("world".into()))).unwrap();
/// ```
pub struct Encoder {
    entries: HashMap<TypeId, EncodeFn>,
}

impl Encoder {
    /// Creates an encoder with the built-in entries.
    ///
    /// Out of the box, [`serde_json::Value`] encodes to its compact JSON text.
    pub fn new() -> Self {
        let mut encoder = Self {
            entries: HashMap::new(),
        };
        encoder.register(|value: serde_json::Value| WireMessage::Text(value.to_string()));
        encoder
    }

    /// Registers an encode function for `T`, replacing any previous entry.
    pub fn register<T, F>(&mut self, encode: F)
    where
        T: Any + Send,
        F: Fn(T) -> WireMessage + Send + Sync + 'static,
    {
        self.entries.insert(
            TypeId::of::<T>(),
            Arc::new(move |boxed| {
                let value = boxed.downcast::<T>().map_err(|_| EncodeError::TypeMismatch)?;
                Ok(encode(*value))
            }),
        );
    }

    /// Resolves a payload to its wire action.
    ///
    /// A [`Payload::Value`] whose runtime type has no registered entry goes
    /// out as a text message carrying the value's display form.
    pub fn encode(&self, payload: Payload) -> Result<WireAction, EncodeError> {
        match payload {
            Payload::Binary(bytes) => Ok(WireAction::Message(WireMessage::Binary(bytes))),
            Payload::Text(text) => Ok(WireAction::Message(WireMessage::Text(text))),
            Payload::Writer(write) => Ok(WireAction::Direct(write)),
            Payload::Value(value) => match self.entries.get(&(*value).type_id()) {
                Some(entry) => entry(value.into_any()).map(WireAction::Message),
                None => Ok(WireAction::Message(WireMessage::Text(value.as_text()))),
            },
        }
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}
