//! Path-to-handler registration for WebSocket endpoints.
//!
//! Exact string match only — no templating, wildcards, or longest-prefix
//! logic. Registering a path twice is a startup error, not a silent override.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::bridge::SessionHandler;

/// Errors produced while registering WebSocket handlers.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("websocket path '{0}' is already registered")]
    DuplicatePath(String),
}

/// Maps a context path to the handler invoked for each connection on it.
#[derive(Default)]
pub struct WebSocketRegistry {
    routes: HashMap<String, Arc<dyn SessionHandler>>,
}

impl WebSocketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for an exact path.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicatePath`] if the path already has a
    /// handler — a fail-fast startup conflict.
    pub fn register(
        &mut self,
        path: impl Into<String>,
        handler: Arc<dyn SessionHandler>,
    ) -> Result<(), RegistryError> {
        let path = path.into();
        if self.routes.contains_key(&path) {
            return Err(RegistryError::DuplicatePath(path));
        }
        self.routes.insert(path, handler);
        Ok(())
    }

    /// Looks up the handler for an exact path.
    pub fn handler(&self, path: &str) -> Option<Arc<dyn SessionHandler>> {
        self.routes.get(path).map(Arc::clone)
    }

    /// Iterates all `(path, handler)` registrations.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn SessionHandler>)> {
        self.routes.iter().map(|(path, h)| (path.as_str(), h))
    }

    /// Number of registered paths.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{ControlReceiver, InboundReceiver, OutboundSender};
    use crate::session::Session;

    fn noop_handler() -> Arc<dyn SessionHandler> {
        Arc::new(
            |_: Session, _: InboundReceiver, _: OutboundSender, _: ControlReceiver| {},
        )
    }

    #[test]
    fn duplicate_registration_fails_fast() {
        let mut registry = WebSocketRegistry::new();
        registry.register("/chat", noop_handler()).unwrap();
        assert!(matches!(
            registry.register("/chat", noop_handler()),
            Err(RegistryError::DuplicatePath(path)) if path == "/chat"
        ));
    }

    #[test]
    fn lookup_is_exact_match_only() {
        let mut registry = WebSocketRegistry::new();
        registry.register("/chat", noop_handler()).unwrap();

        assert!(registry.handler("/chat").is_some());
        assert!(registry.handler("/chat/").is_none());
        assert!(registry.handler("/chat/room").is_none());
        assert!(registry.handler("/cha").is_none());
    }

    #[test]
    fn distinct_paths_coexist() {
        let mut registry = WebSocketRegistry::new();
        registry.register("/chat", noop_handler()).unwrap();
        registry.register("/feed", noop_handler()).unwrap();
        assert_eq!(registry.len(), 2);
    }
}
