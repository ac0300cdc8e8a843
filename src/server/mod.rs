//! Server assembly over an external transport.
//!
//! The actual listeners — TCP accept loops, TLS, HTTP parsing, the upgrade
//! handshake — live behind the [`Transport`] trait. [`ServerBuilder`] collects
//! the HTTP handler and WebSocket registrations, then installs everything on a
//! transport: one [`BridgeFactory`] per registered path, and a `serve` or
//! `serve_tls` call depending on whether TLS material is configured.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::bridge::{Bridge, SessionHandler};
use crate::encode::Encoder;
use crate::http::{HttpHandler, RequestMap, ResponseMap};
use crate::registry::{RegistryError, WebSocketRegistry};

/// Errors produced while assembling or starting the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid listen address {addr}: {source}")]
    InvalidAddress {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// TLS material for the HTTPS listener, loaded by the transport.
#[derive(Debug, Clone, Deserialize)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    #[serde(default)]
    pub key_passphrase: Option<String>,
}

/// Pass-through server configuration honored by the transport.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// When present, the listener serves HTTPS.
    #[serde(default)]
    pub tls: Option<TlsConfig>,

    /// Transport worker pool size.
    #[serde(default = "default_max_threads")]
    pub max_threads: usize,

    /// Idle time after which plain HTTP connections are reaped.
    #[serde(default = "default_max_idle_ms")]
    pub max_idle_ms: u64,

    /// Idle timeout applied to every WebSocket connection at accept time.
    #[serde(default = "default_ws_idle_timeout_ms")]
    pub ws_idle_timeout_ms: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

fn default_port() -> u16 {
    8080
}

fn default_max_threads() -> usize {
    32
}

fn default_max_idle_ms() -> u64 {
    30_000
}

fn default_ws_idle_timeout_ms() -> u64 {
    500_000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            tls: None,
            max_threads: default_max_threads(),
            max_idle_ms: default_max_idle_ms(),
            ws_idle_timeout_ms: default_ws_idle_timeout_ms(),
        }
    }
}

/// Creates one fresh [`Bridge`] per accepted connection on a path.
pub type BridgeFactory = Arc<dyn Fn() -> Bridge + Send + Sync>;

/// The out-of-scope native server capabilities the builder drives.
pub trait Transport {
    /// Starts the plain HTTP listener with the installed handler.
    fn serve(&mut self, addr: SocketAddr, handler: HttpHandler) -> Result<(), ServerError>;

    /// Starts the HTTPS listener with the given TLS material.
    fn serve_tls(
        &mut self,
        addr: SocketAddr,
        tls: &TlsConfig,
        handler: HttpHandler,
    ) -> Result<(), ServerError>;

    /// Installs a bridge factory for upgrade requests on an exact path.
    fn register_upgrade(&mut self, path: &str, factory: BridgeFactory)
    -> Result<(), ServerError>;
}

/// Assembles handlers and configuration, then installs them on a transport.
///
/// # Examples
///
/// ```no_run
/// use sockline::server::{ServerBuilder, ServerConfig};
/// use sockline::http::ResponseMap;
/// # fn run(transport: &mut impl sockline::server::Transport) -> Result<(), sockline::server::ServerError> {
/// use sockline::bridge::{ControlReceiver, InboundReceiver, OutboundSender};
/// use sockline::session::Session;
///
/// ServerBuilder::new(ServerConfig::default())
///     .handle(|req| ResponseMap::new(200).body(format!("hello from {}", req.uri)))
///     .websocket(
///         "/chat",
///         |session: Session, _recv: InboundReceiver, _send: OutboundSender, _ctrl: ControlReceiver| {
///             let _ = session.send("welcome");
///         },
///     )?
///     .install(transport)
/// # }
/// ```
pub struct ServerBuilder {
    config: ServerConfig,
    encoder: Arc<Encoder>,
    http: Option<HttpHandler>,
    registry: WebSocketRegistry,
}

impl ServerBuilder {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            encoder: Arc::new(Encoder::new()),
            http: None,
            registry: WebSocketRegistry::new(),
        }
    }

    /// Replaces the default encoder, e.g. after registering entries for
    /// application value types.
    #[must_use]
    pub fn encoder(mut self, encoder: Encoder) -> Self {
        self.encoder = Arc::new(encoder);
        self
    }

    /// Installs the synchronous HTTP handler. Without one, every plain
    /// request gets a 404.
    #[must_use]
    pub fn handle<F>(mut self, handler: F) -> Self
    where
        F: Fn(RequestMap) -> ResponseMap + Send + Sync + 'static,
    {
        self.http = Some(Arc::new(handler));
        self
    }

    /// Registers a WebSocket handler on an exact path.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicatePath`] (wrapped) if the path is
    /// already taken — registration conflicts prevent server start.
    pub fn websocket<H>(mut self, path: impl Into<String>, handler: H) -> Result<Self, ServerError>
    where
        H: SessionHandler + 'static,
    {
        self.registry.register(path, Arc::new(handler))?;
        Ok(self)
    }

    /// Installs everything on the transport and starts the listener.
    pub fn install<T: Transport>(self, transport: &mut T) -> Result<(), ServerError> {
        let addr_str = format!("{}:{}", self.config.host, self.config.port);
        let addr: SocketAddr = addr_str.parse().map_err(|source| ServerError::InvalidAddress {
            addr: addr_str.clone(),
            source,
        })?;

        let ws_idle = Duration::from_millis(self.config.ws_idle_timeout_ms);
        for (path, handler) in self.registry.iter() {
            let handler = Arc::clone(handler);
            let encoder = Arc::clone(&self.encoder);
            let factory: BridgeFactory = Arc::new(move || {
                Bridge::new(Arc::clone(&handler), Arc::clone(&encoder), ws_idle)
            });
            transport.register_upgrade(path, factory)?;
            debug!(path, idle_timeout_ms = self.config.ws_idle_timeout_ms, "websocket endpoint registered");
        }

        let http = self
            .http
            .unwrap_or_else(|| Arc::new(|_req| ResponseMap::new(404).body("Not Found")));

        info!(address = %addr, tls = self.config.tls.is_some(), "sockline listening");
        match &self.config.tls {
            Some(tls) => transport.serve_tls(addr, tls, http),
            None => transport.serve(addr, http),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{ControlReceiver, InboundReceiver, OutboundSender};
    use crate::session::Session;
    use crate::test_support::MockSocket;

    #[derive(Default)]
    struct MockTransport {
        upgrades: Vec<(String, BridgeFactory)>,
        served: Option<(SocketAddr, HttpHandler)>,
        served_tls: Option<SocketAddr>,
    }

    impl Transport for MockTransport {
        fn serve(&mut self, addr: SocketAddr, handler: HttpHandler) -> Result<(), ServerError> {
            self.served = Some((addr, handler));
            Ok(())
        }

        fn serve_tls(
            &mut self,
            addr: SocketAddr,
            _tls: &TlsConfig,
            handler: HttpHandler,
        ) -> Result<(), ServerError> {
            self.served_tls = Some(addr);
            self.served = Some((addr, handler));
            Ok(())
        }

        fn register_upgrade(
            &mut self,
            path: &str,
            factory: BridgeFactory,
        ) -> Result<(), ServerError> {
            self.upgrades.push((path.to_owned(), factory));
            Ok(())
        }
    }

    fn noop_ws() -> impl SessionHandler {
        |_: Session, _: InboundReceiver, _: OutboundSender, _: ControlReceiver| {}
    }

    fn config_on(host: &str, port: u16) -> ServerConfig {
        ServerConfig {
            host: host.to_owned(),
            port,
            ..ServerConfig::default()
        }
    }

    #[test]
    fn installs_upgrades_and_plain_listener() {
        let mut transport = MockTransport::default();
        ServerBuilder::new(config_on("127.0.0.1", 8080))
            .websocket("/chat", noop_ws())
            .unwrap()
            .install(&mut transport)
            .unwrap();

        assert_eq!(transport.upgrades.len(), 1);
        assert_eq!(transport.upgrades[0].0, "/chat");
        let (addr, _) = transport.served.expect("listener started");
        assert_eq!(addr, "127.0.0.1:8080".parse().unwrap());
        assert!(transport.served_tls.is_none());
    }

    #[test]
    fn tls_material_selects_the_https_listener() {
        let mut transport = MockTransport::default();
        let mut config = config_on("127.0.0.1", 8443);
        config.tls = Some(TlsConfig {
            cert_path: "cert.pem".into(),
            key_path: "key.pem".into(),
            key_passphrase: None,
        });

        ServerBuilder::new(config).install(&mut transport).unwrap();
        assert!(transport.served_tls.is_some());
    }

    #[test]
    fn duplicate_websocket_path_prevents_startup() {
        let result = ServerBuilder::new(ServerConfig::default())
            .websocket("/chat", noop_ws())
            .unwrap()
            .websocket("/chat", noop_ws());
        assert!(matches!(
            result,
            Err(ServerError::Registry(RegistryError::DuplicatePath(_)))
        ));
    }

    #[test]
    fn missing_http_handler_defaults_to_404() {
        let mut transport = MockTransport::default();
        ServerBuilder::new(config_on("127.0.0.1", 8080))
            .install(&mut transport)
            .unwrap();

        let (_, handler) = transport.served.expect("listener started");
        let response = handler(RequestMap::new("GET", "/missing"));
        assert_eq!(response.status, 404);
    }

    #[test]
    fn invalid_host_is_rejected() {
        let mut transport = MockTransport::default();
        let result = ServerBuilder::new(config_on("not an address", 8080)).install(&mut transport);
        assert!(matches!(result, Err(ServerError::InvalidAddress { .. })));
    }

    #[test]
    fn config_defaults_match_the_documented_values() {
        let config: ServerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.ws_idle_timeout_ms, 500_000);
        assert!(config.tls.is_none());
    }

    #[tokio::test]
    async fn bridge_factories_carry_the_configured_idle_timeout() {
        let mut transport = MockTransport::default();
        let mut config = config_on("127.0.0.1", 8080);
        config.ws_idle_timeout_ms = 1_234;

        ServerBuilder::new(config)
            .websocket("/chat", noop_ws())
            .unwrap()
            .install(&mut transport)
            .unwrap();

        let (_, factory) = &transport.upgrades[0];
        let mut bridge = factory();
        let socket = MockSocket::new();
        let timeouts = socket.idle_timeouts();
        bridge.on_connect(Box::new(socket));

        assert_eq!(
            timeouts.lock().unwrap().as_slice(),
            &[Duration::from_millis(1_234)]
        );
    }
}
