//! WebSocket message data model.
//!
//! [`Frame`] is an owned copy of a binary message slice, [`Inbound`] is what a
//! session handler reads off the `recv` channel, and [`WireMessage`] is the
//! normalized form a native socket knows how to write.

use bytes::Bytes;
use thiserror::Error;

/// Errors produced when constructing a [`Frame`].
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame slice [{offset}, {offset}+{len}) exceeds payload of {payload_len} bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        payload_len: usize,
    },
}

/// An owned binary WebSocket message.
///
/// Native transports deliver binary data as a borrowed slice into a reusable
/// I/O buffer that is not guaranteed to survive past the callback. `Frame`
/// therefore copies the payload at construction; mutating the source buffer
/// afterwards never changes the frame's content.
///
/// # Examples
///
/// ```
/// use sockline::message::Frame;
///
/// let frame = Frame::copy_from(&[0, 1, 2, 3, 4], 1, 3).unwrap();
/// assert_eq!(frame.bytes(), &[1, 2, 3]);
/// ```
#[derive(Debug, Clone)]
pub struct Frame {
    payload: Bytes,
    offset: usize,
    len: usize,
}

impl Frame {
    /// Copies `buf` and records the `[offset, offset + len)` window as the
    /// frame's content.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::OutOfBounds`] if the window does not fit inside
    /// `buf`.
    pub fn copy_from(buf: &[u8], offset: usize, len: usize) -> Result<Self, FrameError> {
        let end = offset.checked_add(len);
        if end.is_none() || end.is_some_and(|end| end > buf.len()) {
            return Err(FrameError::OutOfBounds {
                offset,
                len,
                payload_len: buf.len(),
            });
        }
        Ok(Self {
            payload: Bytes::copy_from_slice(buf),
            offset,
            len,
        })
    }

    /// The frame's content: the recorded window into the copied payload.
    pub fn bytes(&self) -> &[u8] {
        &self.payload[self.offset..self.offset + self.len]
    }

    /// Byte offset of the content window within the copied payload.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Length of the content window in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the content window is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Consumes the frame, returning its content as a cheaply-sliced [`Bytes`].
    pub fn into_bytes(self) -> Bytes {
        self.payload.slice(self.offset..self.offset + self.len)
    }
}

// Frames compare by content; the surrounding payload and window position are
// delivery details.
impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.bytes() == other.bytes()
    }
}

impl Eq for Frame {}

/// An item delivered on a session's `recv` channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A complete text message.
    Text(String),
    /// A complete binary message, copied out of the native buffer.
    Binary(Frame),
}

/// A fully-encoded message ready to be written to a native socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireMessage {
    /// A binary frame, sent verbatim.
    Binary(Bytes),
    /// A text frame, sent as UTF-8.
    Text(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_windows_the_payload() {
        let frame = Frame::copy_from(&[0, 1, 2, 3, 4], 1, 3).unwrap();
        assert_eq!(frame.bytes(), &[1, 2, 3]);
        assert_eq!(frame.offset(), 1);
        assert_eq!(frame.len(), 3);
        assert!(!frame.is_empty());
    }

    #[test]
    fn frame_copies_before_returning() {
        let mut source = vec![0u8, 1, 2, 3, 4];
        let frame = Frame::copy_from(&source, 1, 3).unwrap();
        // The native buffer may be reused the moment the callback returns.
        source.iter_mut().for_each(|b| *b = 0xff);
        assert_eq!(frame.bytes(), &[1, 2, 3]);
    }

    #[test]
    fn frame_rejects_out_of_bounds_window() {
        assert!(matches!(
            Frame::copy_from(&[0, 1, 2], 2, 2),
            Err(FrameError::OutOfBounds { .. })
        ));
        assert!(matches!(
            Frame::copy_from(&[0, 1, 2], usize::MAX, 2),
            Err(FrameError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn frame_into_bytes_keeps_only_the_window() {
        let frame = Frame::copy_from(b"hello world", 6, 5).unwrap();
        assert_eq!(frame.into_bytes(), Bytes::from_static(b"world"));
    }

    #[test]
    fn frames_compare_by_content() {
        let a = Frame::copy_from(&[9, 1, 2, 3, 9], 1, 3).unwrap();
        let b = Frame::copy_from(&[1, 2, 3], 0, 3).unwrap();
        assert_eq!(a, b);
    }
}
