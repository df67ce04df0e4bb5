//! The network transport the API middleware calls through.
//!
//! # Implementations
//!
//! - `HttpTransport` (in `call-api-runtime`): reqwest-backed, production
//! - `MockTransport` (in `call-api-testing`): canned responses for tests
//!
//! # Dyn Compatibility
//!
//! `fetch` returns a boxed `Send` future so the middleware can hold an
//! `Arc<dyn Transport>` and move it into spawned tasks.

use futures::future::BoxFuture;
use serde_json::Value;
use thiserror::Error;

/// The transport could not produce a response at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connecting, sending, or receiving failed (DNS, refused, reset, ...).
    #[error("Network request failed: {0}")]
    Request(String),

    /// The response started but its body could not be read.
    #[error("Failed to read response body: {0}")]
    Body(String),
}

/// A completed HTTP response with its body fully read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    status: u16,
    body: Vec<u8>,
}

impl TransportResponse {
    /// Create a response from a status code and raw body.
    #[must_use]
    pub const fn new(status: u16, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    /// Create a response whose body is the serialized `value`.
    #[must_use]
    pub fn json_body(status: u16, value: &Value) -> Self {
        Self::new(status, value.to_string().into_bytes())
    }

    /// The HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Whether the status is in the 2xx range.
    #[must_use]
    pub const fn ok(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// The raw body.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Parse the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the body is not valid JSON.
    pub fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Future returned by [`Transport::fetch`].
pub type FetchFuture<'a> = BoxFuture<'a, Result<TransportResponse, TransportError>>;

/// Performs a GET request for a fully resolved URL.
pub trait Transport: Send + Sync {
    /// Fetch `url`.
    ///
    /// Resolves to `Ok` for any HTTP response, whatever its status; only a
    /// failure to get a response at all is an `Err`.
    fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a>;
}
