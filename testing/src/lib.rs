//! # call-api Testing
//!
//! Testing utilities for the call-api middleware.
//!
//! This crate provides:
//! - [`MockTransport`]: canned HTTP responses, request recording, gated replies
//! - [`RecordingNext`]: a chain terminal that records forwarded actions
//! - [`ReducerTest`]: Given-When-Then reducer tests
//! - Assertion helpers for call outcomes and action sequences
//!
//! ## Example
//!
//! ```
//! use call_api_core::{ApiAction, CallApi, Middleware};
//! use call_api_runtime::ApiMiddleware;
//! use call_api_testing::{MockTransport, RecordingNext};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let transport = MockTransport::new();
//! transport.respond_json("https://api.spotify.com/v1/me", 200, json!({"display_name": "Ada"}));
//!
//! let middleware = ApiMiddleware::with_transport(transport.clone());
//! let recorder = RecordingNext::new();
//!
//! let action = ApiAction::new(CallApi::new("me", ["ME_REQUEST", "ME_SUCCESS", "ME_FAILURE"]));
//! let dispatched = middleware.handle(action.into(), &recorder.next()).unwrap();
//! dispatched.settled().await.unwrap();
//!
//! assert_eq!(recorder.kinds(), vec!["ME_REQUEST", "ME_SUCCESS"]);
//! # }
//! ```

use call_api_runtime::ApiConfig;

pub mod transport_mocks;

pub use reducer_test::{ReducerTest, assertions};
pub use transport_mocks::{Gate, MockTransport, RecordingNext};

/// Base URL used by [`test_config`].
pub const TEST_BASE_URL: &str = "https://api.test/v1/";

/// Configuration pointing at [`TEST_BASE_URL`]
#[must_use]
pub fn test_config() -> ApiConfig {
    ApiConfig::default().with_base_url(TEST_BASE_URL)
}

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs. Honors
/// `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "call_api_runtime=debug".into()),
        )
        .with_test_writer()
        .try_init();
}
