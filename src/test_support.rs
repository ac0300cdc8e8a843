//! Shared test doubles for the native transport seam.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;

use crate::message::WireMessage;
use crate::wire::{NativeSocket, SocketError, WireWriter, WriterFn};

/// Installs a fmt subscriber for the test process, once, so bridge and
/// session traces show up under `RUST_LOG` during test runs.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A recording [`NativeSocket`] for session and bridge tests.
pub(crate) struct MockSocket {
    peer: Option<SocketAddr>,
    written: Arc<Mutex<Vec<WireMessage>>>,
    closes: Arc<AtomicUsize>,
    idle_timeouts: Arc<Mutex<Vec<Duration>>>,
}

impl MockSocket {
    pub(crate) fn new() -> Self {
        Self::with_peer("127.0.0.1:9001".parse().expect("static addr"))
    }

    pub(crate) fn with_peer(peer: SocketAddr) -> Self {
        Self {
            peer: Some(peer),
            written: Arc::default(),
            closes: Arc::default(),
            idle_timeouts: Arc::default(),
        }
    }

    /// A socket with no recorded peer address.
    pub(crate) fn anonymous() -> Self {
        Self {
            peer: None,
            written: Arc::default(),
            closes: Arc::default(),
            idle_timeouts: Arc::default(),
        }
    }

    pub(crate) fn written(&self) -> Arc<Mutex<Vec<WireMessage>>> {
        Arc::clone(&self.written)
    }

    pub(crate) fn close_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.closes)
    }

    pub(crate) fn idle_timeouts(&self) -> Arc<Mutex<Vec<Duration>>> {
        Arc::clone(&self.idle_timeouts)
    }
}

struct MockWriter {
    written: Arc<Mutex<Vec<WireMessage>>>,
}

impl WireWriter for MockWriter {
    fn write_text(&mut self, text: &str) -> Result<(), SocketError> {
        self.written
            .lock()
            .expect("mock lock")
            .push(WireMessage::Text(text.to_owned()));
        Ok(())
    }

    fn write_binary(&mut self, bytes: &[u8]) -> Result<(), SocketError> {
        self.written
            .lock()
            .expect("mock lock")
            .push(WireMessage::Binary(Bytes::copy_from_slice(bytes)));
        Ok(())
    }
}

impl NativeSocket for MockSocket {
    fn write(&mut self, message: WireMessage) -> Result<(), SocketError> {
        self.written.lock().expect("mock lock").push(message);
        Ok(())
    }

    fn write_with(&mut self, write: WriterFn) -> Result<(), SocketError> {
        let mut writer = MockWriter {
            written: Arc::clone(&self.written),
        };
        write(&mut writer)
    }

    fn close(&mut self) -> Result<(), SocketError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    fn set_idle_timeout(&mut self, timeout: Duration) -> Result<(), SocketError> {
        self.idle_timeouts.lock().expect("mock lock").push(timeout);
        Ok(())
    }
}
