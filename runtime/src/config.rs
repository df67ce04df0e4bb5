//! Configuration for the API middleware.
//!
//! # Example
//!
//! ```
//! use call_api_runtime::config::ApiConfig;
//!
//! let config = ApiConfig::default();
//! assert_eq!(
//!     config.resolve_url("albums/123"),
//!     "https://api.spotify.com/v1/albums/123"
//! );
//!
//! let local = ApiConfig::default().with_base_url("http://127.0.0.1:8080/v1/");
//! assert!(local.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "https://api.spotify.com/v1/";

/// Configuration error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiConfigError {
    /// The base URL is empty.
    #[error("Configuration validation failed: base_url cannot be empty")]
    EmptyBaseUrl,

    /// The base URL is not http(s).
    #[error(
        "Configuration validation failed: base_url must start with http:// or https:// (got {0})"
    )]
    UnsupportedScheme(String),
}

/// API middleware configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Prefix for relative endpoints. Include the trailing slash; it is
    /// concatenated as-is.
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl ApiConfig {
    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns error if the base URL is empty or not http(s)
    pub fn validate(&self) -> Result<(), ApiConfigError> {
        if self.base_url.is_empty() {
            return Err(ApiConfigError::EmptyBaseUrl);
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ApiConfigError::UnsupportedScheme(self.base_url.clone()));
        }
        Ok(())
    }

    /// Resolve an endpoint against the base URL.
    ///
    /// An endpoint that already contains the base URL anywhere is used
    /// verbatim; anything else gets the base URL prepended.
    #[must_use]
    pub fn resolve_url(&self, endpoint: &str) -> String {
        if endpoint.contains(&self.base_url) {
            endpoint.to_string()
        } else {
            format!("{}{endpoint}", self.base_url)
        }
    }
}
