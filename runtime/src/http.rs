//! reqwest-backed [`Transport`].

use call_api_core::transport::{FetchFuture, Transport, TransportError, TransportResponse};
use reqwest::header::ACCEPT;

/// HTTP transport over a shared `reqwest::Client`.
///
/// Every call is a plain GET with `Accept: application/json`. The body is read
/// fully before the future resolves.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with a default client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport over an existing client (custom TLS, proxies, headers).
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a> {
        Box::pin(async move {
            let response = self
                .client
                .get(url)
                .header(ACCEPT, "application/json")
                .send()
                .await
                .map_err(|e| TransportError::Request(e.to_string()))?;

            let status = response.status().as_u16();
            let body = response
                .bytes()
                .await
                .map_err(|e| TransportError::Body(e.to_string()))?;

            tracing::trace!(url, status, bytes = body.len(), "HTTP response received");

            Ok(TransportResponse::new(status, body.to_vec()))
        })
    }
}
