//! Reducer composition utilities
//!
//! - **`combine_reducers`**: run several reducers over the same state, in order
//! - **`scope_reducer`**: focus a reducer on one slice of a larger state
//!
//! # Example
//!
//! ```
//! use call_api_core::action::Action;
//! use call_api_core::composition::{combine_reducers, scope_reducer};
//! use call_api_core::reducer::Reducer;
//!
//! #[derive(Default)]
//! struct AppState {
//!     requests: u32,
//!     errors: Vec<String>,
//! }
//!
//! struct RequestCounter;
//! impl Reducer for RequestCounter {
//!     type State = u32;
//!     fn reduce(&self, count: &mut u32, action: &Action) {
//!         if action.kind.ends_with("_REQUEST") {
//!             *count += 1;
//!         }
//!     }
//! }
//!
//! struct ErrorLog;
//! impl Reducer for ErrorLog {
//!     type State = Vec<String>;
//!     fn reduce(&self, errors: &mut Vec<String>, action: &Action) {
//!         if action.error().is_some() {
//!             errors.push(action.kind.clone());
//!         }
//!     }
//! }
//!
//! let reducers: Vec<Box<dyn Reducer<State = AppState>>> = vec![
//!     Box::new(scope_reducer(RequestCounter, |s: &mut AppState| &mut s.requests)),
//!     Box::new(scope_reducer(ErrorLog, |s: &mut AppState| &mut s.errors)),
//! ];
//! let app = combine_reducers(reducers);
//!
//! let mut state = AppState::default();
//! app.reduce(&mut state, &Action::new("ALBUM_REQUEST"));
//! assert_eq!(state.requests, 1);
//! ```

use crate::action::Action;
use crate::reducer::Reducer;
use std::marker::PhantomData;

/// Runs every reducer on each action, in the order given.
pub struct CombinedReducer<S> {
    reducers: Vec<Box<dyn Reducer<State = S>>>,
}

impl<S> Reducer for CombinedReducer<S> {
    type State = S;

    fn reduce(&self, state: &mut S, action: &Action) {
        for reducer in &self.reducers {
            reducer.reduce(state, action);
        }
    }
}

/// Combine reducers that share a state type.
#[must_use]
pub fn combine_reducers<S>(reducers: Vec<Box<dyn Reducer<State = S>>>) -> CombinedReducer<S> {
    CombinedReducer { reducers }
}

/// A reducer over a slice of a parent state.
pub struct ScopedReducer<R, F, P> {
    inner: R,
    lens: F,
    _parent: PhantomData<fn(&mut P)>,
}

impl<R, F, P> Reducer for ScopedReducer<R, F, P>
where
    R: Reducer,
    F: Fn(&mut P) -> &mut R::State + Send + Sync,
{
    type State = P;

    fn reduce(&self, state: &mut P, action: &Action) {
        self.inner.reduce((self.lens)(state), action);
    }
}

/// Focus `inner` on the part of the parent state selected by `lens`.
pub const fn scope_reducer<R, F, P>(inner: R, lens: F) -> ScopedReducer<R, F, P>
where
    R: Reducer,
    F: Fn(&mut P) -> &mut R::State + Send + Sync,
{
    ScopedReducer {
        inner,
        lens,
        _parent: PhantomData,
    }
}
