//! # call-api Runtime
//!
//! Runtime pieces for the call-api middleware.
//!
//! ## Core Components
//!
//! - **`ApiMiddleware`**: expands API-call actions into request / success /
//!   failure lifecycle actions around one network call
//! - **`HttpTransport`**: reqwest-backed transport
//! - **`Store`**: the dispatcher; runs actions through the middleware chain,
//!   then the reducer
//!
//! ## Example
//!
//! ```no_run
//! use call_api_core::{Action, ApiAction, CallApi, Reducer};
//! use call_api_runtime::{ApiConfig, ApiMiddleware, HttpTransport, Store};
//! use std::sync::Arc;
//!
//! struct Log;
//! impl Reducer for Log {
//!     type State = Vec<Action>;
//!     fn reduce(&self, state: &mut Vec<Action>, action: &Action) {
//!         state.push(action.clone());
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let api = ApiMiddleware::new(ApiConfig::default(), Arc::new(HttpTransport::new()));
//! let store = Store::with_middleware(Vec::new(), Log, vec![Arc::new(api)]);
//!
//! // REQUEST is reduced before dispatch returns
//! let pending = store.dispatch(ApiAction::new(CallApi::new(
//!     "albums/123",
//!     ["ALBUM_REQUEST", "ALBUM_SUCCESS", "ALBUM_FAILURE"],
//! )))?;
//!
//! // SUCCESS or FAILURE follows once the call settles
//! pending.settled().await?;
//! # Ok(())
//! # }
//! ```

/// The API middleware
pub mod api;

/// Middleware configuration
pub mod config;

/// reqwest transport
pub mod http;

/// Metric names and descriptions
pub mod metrics;

/// Store runtime for coordinating middleware and reducer execution.
pub mod store;

pub use api::{ApiMiddleware, CallFailure, call_api};
pub use config::{ApiConfig, ApiConfigError, DEFAULT_BASE_URL};
pub use http::HttpTransport;
pub use store::{Store, StoreConfig};
