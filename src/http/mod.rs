//! The normalized HTTP request/response contract.
//!
//! The transport decodes both native request shapes — a plain HTTP request
//! and a WebSocket upgrade request — into the same [`RequestMap`], and
//! encodes a [`ResponseMap`] back into its native response. Header names are
//! lower-cased and multi-valued headers fold into one comma-joined value, so
//! handlers never deal with transport-specific casing or repetition.

use std::sync::Arc;

use bytes::Bytes;

/// A lower-casing, comma-folding HTTP header map.
///
/// # Examples
///
/// ```
/// use sockline::http::Headers;
///
/// let mut headers = Headers::new();
/// headers.insert("Accept", "text/html");
/// headers.insert("ACCEPT", "application/json");
///
/// assert_eq!(headers.get("accept"), Some("text/html,application/json"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    inner: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header entry. The name is lower-cased; a repeated name folds
    /// its value onto the existing entry with a `,` separator.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        let name = name.as_ref().to_ascii_lowercase();
        let value = value.into();
        match self.inner.iter_mut().find(|(k, _)| *k == name) {
            Some((_, existing)) => {
                existing.push(',');
                existing.push_str(&value);
            }
            None => self.inner.push((name, value)),
        }
    }

    /// Returns the (folded) value for a header name, matched case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.inner
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns `true` if the map has an entry for the given name.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if there are no header entries.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterates `(name, value)` pairs in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A normalized request description, as produced by the transport's decoder.
#[derive(Debug, Clone)]
pub struct RequestMap {
    /// Request path, without the query string.
    pub uri: String,
    /// Raw query string, without the leading `?`.
    pub query_string: Option<String>,
    /// Lower-cased, comma-folded headers.
    pub headers: Headers,
    /// Request method, upper-case.
    pub method: String,
    /// The `Host` the client addressed.
    pub host: Option<String>,
    /// The `Origin` of a browser request, when present.
    pub origin: Option<String>,
}

impl RequestMap {
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            query_string: None,
            headers: Headers::new(),
            method: method.into(),
            host: None,
            origin: None,
        }
    }

    #[must_use]
    pub fn query_string(mut self, query: impl Into<String>) -> Self {
        self.query_string = Some(query.into());
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    #[must_use]
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }
}

/// A normalized response description, consumed by the transport's encoder.
#[derive(Debug, Clone)]
pub struct ResponseMap {
    /// HTTP status code.
    pub status: u16,
    /// Response headers (lower-cased, folded like request headers).
    pub headers: Headers,
    /// Response body bytes.
    pub body: Bytes,
}

impl ResponseMap {
    /// Creates a response with the given status and an empty body.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets the body from a string.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Bytes::from(body.into());
        self
    }

    /// Sets the body from raw bytes.
    #[must_use]
    pub fn body_bytes(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}

/// The synchronous HTTP handler the server installs on the transport.
///
/// Receives every non-upgrade request as a [`RequestMap`] and returns the
/// [`ResponseMap`] to encode. Shared across transport worker threads.
pub type HttpHandler = Arc<dyn Fn(RequestMap) -> ResponseMap + Send + Sync>;
