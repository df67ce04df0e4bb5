//! The API middleware.
//!
//! Expands [`AnyAction::CallApi`] into lifecycle actions around one network
//! call; passes everything else through untouched.
//!
//! # Flow
//!
//! 1. **Validate** the descriptor. A malformed one fails the dispatch
//!    before anything is forwarded.
//! 2. **Forward** the request action synchronously.
//! 3. **Spawn** the call: fetch, parse JSON, camelize keys, normalize with
//!    the schema if one was given.
//! 4. **Forward** exactly one terminal action: success with `response`, or
//!    failure with `error`.
//!
//! # Example
//!
//! ```no_run
//! use call_api_core::{Action, ApiAction, CallApi, Reducer};
//! use call_api_runtime::{ApiMiddleware, Store};
//! use std::sync::Arc;
//!
//! # struct AppReducer;
//! # impl Reducer for AppReducer {
//! #     type State = Vec<String>;
//! #     fn reduce(&self, state: &mut Vec<String>, action: &Action) {
//! #         state.push(action.kind.clone());
//! #     }
//! # }
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Store::with_middleware(
//!     Vec::new(),
//!     AppReducer,
//!     vec![Arc::new(ApiMiddleware::http())],
//! );
//!
//! let dispatched = store.dispatch(ApiAction::new(CallApi::new(
//!     "albums/4aawyAB9vmqN3uQ7FjRGTy",
//!     ["ALBUM_REQUEST", "ALBUM_SUCCESS", "ALBUM_FAILURE"],
//! )))?;
//! let outcome = dispatched.settled().await?;
//! # Ok(())
//! # }
//! ```

use crate::config::ApiConfig;
use crate::http::HttpTransport;
use crate::metrics::{
    CALL_DURATION, CALLS_FAILED, CALLS_SUCCEEDED, CALLS_TOTAL, DESCRIPTOR_REJECTED,
};
use call_api_core::action::{AnyAction, ApiAction, ERROR_FIELD, RESPONSE_FIELD};
use call_api_core::camelize::camelize_keys;
use call_api_core::descriptor::ValidatedCall;
use call_api_core::middleware::{
    CallCompleter, CallHandle, CallOutcome, DispatchError, Dispatched, Middleware, Next,
};
use call_api_core::schema::{NormalizeError, Schema, normalize};
use call_api_core::transport::{Transport, TransportError};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::Instrument;

/// Why a call ended on the failure path.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CallFailure {
    /// The transport could not get a response.
    #[error(transparent)]
    Network(#[from] TransportError),

    /// The server answered with a non-2xx status; `body` is its parsed JSON.
    #[error("Server responded with status {status}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Parsed response body.
        body: Value,
    },

    /// The response body was not JSON.
    #[error("Response body is not valid JSON: {0}")]
    InvalidJson(String),

    /// The response did not fit the schema.
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

impl CallFailure {
    /// The value carried under `error` on the failure action.
    ///
    /// Server errors carry the response body exactly as parsed, without key
    /// normalization. Every other failure is described as
    /// `{"name": ..., "message": ...}`.
    #[must_use]
    pub fn into_payload(self) -> Value {
        let name = match &self {
            Self::Server { .. } => "ServerError",
            Self::Network(_) => "NetworkFailure",
            Self::InvalidJson(_) => "InvalidJson",
            Self::Normalize(_) => "NormalizeError",
        };
        match self {
            Self::Server { body, .. } => body,
            other => json!({"name": name, "message": other.to_string()}),
        }
    }
}

/// Fetch `url` and shape the response.
///
/// The body is parsed before the status is checked, so an error status with
/// a non-JSON body is reported as [`CallFailure::InvalidJson`].
///
/// # Errors
///
/// Any [`CallFailure`].
pub async fn call_api(
    transport: &dyn Transport,
    url: &str,
    schema: Option<&Schema>,
) -> Result<Value, CallFailure> {
    let response = transport.fetch(url).await?;
    let body = response
        .json()
        .map_err(|e| CallFailure::InvalidJson(e.to_string()))?;

    if !response.ok() {
        return Err(CallFailure::Server {
            status: response.status(),
            body,
        });
    }

    let camelized = camelize_keys(body);
    match schema {
        Some(schema) => Ok(normalize(&camelized, schema)?.into_value()),
        None => Ok(camelized),
    }
}

/// Middleware that performs API calls described by [`AnyAction::CallApi`].
#[derive(Clone)]
pub struct ApiMiddleware {
    config: ApiConfig,
    transport: Arc<dyn Transport>,
}

impl ApiMiddleware {
    /// Create a middleware with explicit configuration and transport.
    #[must_use]
    pub fn new(config: ApiConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    /// Default configuration over the given transport.
    #[must_use]
    pub fn with_transport<T: Transport + 'static>(transport: T) -> Self {
        Self::new(ApiConfig::default(), Arc::new(transport))
    }

    /// Default configuration over [`HttpTransport`].
    #[must_use]
    pub fn http() -> Self {
        Self::with_transport(HttpTransport::new())
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn start_call(
        &self,
        action: ApiAction,
        call: ValidatedCall,
        next: &Next,
    ) -> Result<Dispatched, DispatchError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| DispatchError::NoRuntime)?;
        let url = self.config.resolve_url(&call.endpoint);

        tracing::debug!(url = %url, action = %call.types.request, "Dispatching API request");
        metrics::counter!(CALLS_TOTAL).increment(1);
        next.call(action.lifecycle(&call.types.request, None))?;

        let (completer, handle) = CallHandle::pair();
        let transport = Arc::clone(&self.transport);
        let next = next.clone();
        let span = tracing::debug_span!("api_call", url = %url);

        let task = run_call(transport, url, action, call, next, completer)
            .instrument(span);
        runtime.spawn(task);

        Ok(Dispatched::Pending(handle))
    }
}

/// Body of the spawned call task: fetch, forward the terminal action, report.
async fn run_call(
    transport: Arc<dyn Transport>,
    url: String,
    action: ApiAction,
    call: ValidatedCall,
    next: Next,
    completer: CallCompleter,
) {
    let started = Instant::now();
    let outcome = match call_api(transport.as_ref(), &url, call.schema.as_ref()).await {
        Ok(response) => {
            tracing::debug!(action = %call.types.success, "API call succeeded");
            metrics::counter!(CALLS_SUCCEEDED).increment(1);
            let success = action.lifecycle(&call.types.success, Some((RESPONSE_FIELD, response)));
            CallOutcome::Succeeded(success)
        }
        Err(failure) => {
            tracing::warn!(
                action = %call.types.failure,
                error = %failure,
                "API call failed"
            );
            metrics::counter!(CALLS_FAILED).increment(1);
            let payload = failure.into_payload();
            CallOutcome::Failed(action.lifecycle(&call.types.failure, Some((ERROR_FIELD, payload))))
        }
    };
    metrics::histogram!(CALL_DURATION).record(started.elapsed().as_secs_f64());

    if let Err(error) = next.call(outcome.action().clone()) {
        tracing::warn!(
            error = %error,
            "Terminal lifecycle action was rejected downstream"
        );
    }
    completer.complete(outcome);
}

impl std::fmt::Debug for ApiMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMiddleware")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Middleware for ApiMiddleware {
    fn handle(&self, action: AnyAction, next: &Next) -> Result<Dispatched, DispatchError> {
        let api_action = match action {
            AnyAction::Plain(_) => return next.call(action),
            AnyAction::CallApi(api_action) => api_action,
        };

        let call = api_action.call.validate().map_err(|error| {
            tracing::warn!(error = %error, "Rejected malformed API call descriptor");
            metrics::counter!(DESCRIPTOR_REJECTED).increment(1);
            DispatchError::from(error)
        })?;

        self.start_call(api_action, call, next)
    }
}
