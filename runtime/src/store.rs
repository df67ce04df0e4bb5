//! The Store - dispatcher coordinating middleware and reducer.

use crate::metrics::STORE_ACTIONS_TOTAL;
use call_api_core::action::{Action, AnyAction};
use call_api_core::middleware::{DispatchError, Dispatched, Middleware, Next, chain};
use call_api_core::reducer::Reducer;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

/// Configuration for Store instances
///
/// # Example
///
/// ```
/// use call_api_runtime::StoreConfig;
///
/// let config = StoreConfig::default().with_broadcast_capacity(256);
/// assert_eq!(config.broadcast_capacity, 256);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Number of reduced actions buffered for slow observers.
    pub broadcast_capacity: usize,
}

impl StoreConfig {
    /// Set the action broadcast capacity
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 16,
        }
    }
}

/// The Store - owns state and runs every dispatch through the middleware
/// chain and then the reducer
///
/// The Store manages:
/// 1. State (behind a `RwLock`)
/// 2. Middleware chain (fixed at construction)
/// 3. Reducer (applied to plain actions at the end of the chain)
/// 4. Action broadcast (every reduced action, for observers)
///
/// Dispatch is synchronous: by the time [`Store::dispatch`] returns, the
/// action and anything middlewares forwarded synchronously (such as request
/// lifecycle actions) have been reduced. Asynchronous work is reported
/// through [`Dispatched::Pending`].
///
/// # Example
///
/// ```
/// use call_api_core::{Action, Reducer};
/// use call_api_runtime::Store;
///
/// struct Counter;
/// impl Reducer for Counter {
///     type State = u32;
///     fn reduce(&self, count: &mut u32, action: &Action) {
///         if action.is("INCREMENT") {
///             *count += 1;
///         }
///     }
/// }
///
/// # fn main() -> Result<(), call_api_core::DispatchError> {
/// let store = Store::new(0, Counter);
/// store.dispatch(Action::new("INCREMENT"))?;
/// assert_eq!(store.state(|count| *count), 1);
/// # Ok(())
/// # }
/// ```
pub struct Store<S> {
    state: Arc<RwLock<S>>,
    dispatch: Next,
    /// Every action that reached the reducer, in reduction order.
    action_broadcast: broadcast::Sender<Action>,
}

impl<S> Store<S>
where
    S: Send + Sync + 'static,
{
    /// Create a store with no middleware
    #[must_use]
    pub fn new<R>(initial_state: S, reducer: R) -> Self
    where
        R: Reducer<State = S> + 'static,
    {
        Self::with_config(initial_state, reducer, Vec::new(), StoreConfig::default())
    }

    /// Create a store whose dispatches pass through `middlewares`, first to last
    #[must_use]
    pub fn with_middleware<R>(
        initial_state: S,
        reducer: R,
        middlewares: Vec<Arc<dyn Middleware>>,
    ) -> Self
    where
        R: Reducer<State = S> + 'static,
    {
        Self::with_config(initial_state, reducer, middlewares, StoreConfig::default())
    }

    /// Create a store with custom configuration
    #[must_use]
    pub fn with_config<R>(
        initial_state: S,
        reducer: R,
        middlewares: Vec<Arc<dyn Middleware>>,
        config: StoreConfig,
    ) -> Self
    where
        R: Reducer<State = S> + 'static,
    {
        let (action_broadcast, _) = broadcast::channel(config.broadcast_capacity.max(1));
        let state = Arc::new(RwLock::new(initial_state));
        let terminal = reduce_step(Arc::clone(&state), reducer, action_broadcast.clone());

        Self {
            state,
            dispatch: chain(&middlewares, terminal),
            action_broadcast,
        }
    }

    /// Dispatch an action through the middleware chain
    ///
    /// # Errors
    ///
    /// - [`DispatchError::Descriptor`]: an API-call descriptor was malformed
    /// - [`DispatchError::UnhandledApiCall`]: an API-call action reached the
    ///   reducer because no middleware expanded it
    /// - [`DispatchError::NoRuntime`]: an API call was dispatched outside a
    ///   tokio runtime
    #[tracing::instrument(skip(self, action), name = "store_dispatch")]
    pub fn dispatch(&self, action: impl Into<AnyAction>) -> Result<Dispatched, DispatchError> {
        self.dispatch.call(action)
    }

    /// A [`Next`] that dispatches into this store, for middlewares that need
    /// to re-enter the chain from the top
    #[must_use]
    pub fn dispatcher(&self) -> Next {
        self.dispatch.clone()
    }

    /// Read current state via a closure
    ///
    /// ```ignore
    /// let album_count = store.state(|s| s.entities.albums.len());
    /// ```
    pub fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&S) -> T,
    {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    /// Subscribe to every action the reducer processes
    ///
    /// Subscribe before dispatching to observe the whole lifecycle of a call.
    #[must_use]
    pub fn subscribe_actions(&self) -> broadcast::Receiver<Action> {
        self.action_broadcast.subscribe()
    }
}

impl<S> std::fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("observers", &self.action_broadcast.receiver_count())
            .finish_non_exhaustive()
    }
}

/// The last link of the chain: reduce plain actions, reject API calls.
fn reduce_step<S, R>(
    state: Arc<RwLock<S>>,
    reducer: R,
    action_broadcast: broadcast::Sender<Action>,
) -> Next
where
    S: Send + Sync + 'static,
    R: Reducer<State = S> + 'static,
{
    Next::new(move |action| {
        let AnyAction::Plain(action) = action else {
            tracing::warn!("Rejected API call action: no middleware expanded it");
            return Err(DispatchError::UnhandledApiCall);
        };

        {
            let mut state = state.write().unwrap_or_else(PoisonError::into_inner);
            let span = tracing::debug_span!("reducer_execution", action = %action.kind);
            let _enter = span.enter();
            reducer.reduce(&mut state, &action);

            // Broadcast under the lock so observers see reduction order.
            // No observers is not an error.
            let _ = action_broadcast.send(action);
        }
        metrics::counter!(STORE_ACTIONS_TOTAL).increment(1);

        Ok(Dispatched::Done)
    })
}
