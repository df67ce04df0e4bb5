//! # call-api Core
//!
//! Core types for the call-api middleware.
//!
//! An application dispatches actions into a store. Most actions are plain
//! and go straight to the reducer. An API-call action instead carries a
//! descriptor (endpoint, three lifecycle types, optional schema); the API
//! middleware expands it into lifecycle actions around a network call:
//!
//! ```text
//! dispatch(CallApi)
//!   ├─▶ REQUEST                         (synchronously)
//!   └─▶ SUCCESS { response }            (after the call settles)
//!       or FAILURE { error }
//! ```
//!
//! ## Modules
//!
//! - [`action`]: plain actions and the [`action::AnyAction`] union
//! - [`descriptor`]: the [`descriptor::CallApi`] descriptor and its validation
//! - [`middleware`]: the [`middleware::Middleware`] trait and chain composition
//! - [`reducer`]: the [`reducer::Reducer`] trait
//! - [`composition`]: combining reducers
//! - [`transport`]: the [`transport::Transport`] seam for HTTP
//! - [`camelize`]: `snake_case` → `camelCase` key normalization
//! - [`schema`]: flattening nested responses into entity tables

pub mod action;
pub mod camelize;
pub mod composition;
pub mod descriptor;
pub mod middleware;
pub mod schema;
pub mod transport;

/// Reducer module - state transitions driven by plain actions
///
/// Reducers never see API-call actions: by the time an action reaches them,
/// the API middleware has expanded it into plain lifecycle actions.
pub mod reducer {
    use crate::action::Action;

    /// The Reducer trait - core abstraction for state updates
    ///
    /// # Example
    ///
    /// ```
    /// use call_api_core::action::Action;
    /// use call_api_core::reducer::Reducer;
    ///
    /// #[derive(Default)]
    /// struct LoadingState {
    ///     loading: bool,
    /// }
    ///
    /// struct LoadingReducer;
    ///
    /// impl Reducer for LoadingReducer {
    ///     type State = LoadingState;
    ///
    ///     fn reduce(&self, state: &mut LoadingState, action: &Action) {
    ///         match action.kind.as_str() {
    ///             "ALBUM_REQUEST" => state.loading = true,
    ///             "ALBUM_SUCCESS" | "ALBUM_FAILURE" => state.loading = false,
    ///             _ => {}
    ///         }
    ///     }
    /// }
    ///
    /// let mut state = LoadingState::default();
    /// LoadingReducer.reduce(&mut state, &Action::new("ALBUM_REQUEST"));
    /// assert!(state.loading);
    /// ```
    pub trait Reducer: Send + Sync {
        /// The state type this reducer operates on
        type State;

        /// Apply an action to state in place
        fn reduce(&self, state: &mut Self::State, action: &Action);
    }

    impl<R: Reducer + ?Sized> Reducer for Box<R> {
        type State = R::State;

        fn reduce(&self, state: &mut Self::State, action: &Action) {
            (**self).reduce(state, action);
        }
    }
}

// Re-export commonly used types
pub use action::{Action, AnyAction, ApiAction};
pub use descriptor::{CallApi, ConfigError, DescriptorError};
pub use middleware::{CallHandle, CallOutcome, DispatchError, Dispatched, Middleware, Next};
pub use reducer::Reducer;
pub use schema::{Entity, Normalized, Schema};
pub use transport::{Transport, TransportError, TransportResponse};
pub use serde_json::{Value, json};
