//! Middleware: interceptors sitting between `dispatch` and the reducer.
//!
//! A [`Middleware`] receives every dispatched action together with [`Next`],
//! the rest of the chain. It may forward the action, forward something else,
//! forward several actions over time, or reject the dispatch with an error.
//!
//! [`chain`] composes middlewares in order around a terminal [`Next`]
//! (usually the store's reducer step):
//!
//! ```text
//! dispatch ─▶ m[0] ─▶ m[1] ─▶ ... ─▶ terminal (reduce)
//! ```
//!
//! Dispatch is synchronous. Middlewares that start asynchronous work return
//! [`Dispatched::Pending`] with a [`CallHandle`] the caller can await.

use crate::action::{Action, AnyAction};
use crate::descriptor::DescriptorError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;

/// Errors returned from a dispatch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// An API-call descriptor was malformed. Nothing was forwarded.
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    /// An API-call action reached the reducer without being expanded.
    #[error("API call action reached the reducer; no API middleware is installed")]
    UnhandledApiCall,

    /// No tokio runtime is running to drive the network call.
    #[error("No tokio runtime available to run the API call")]
    NoRuntime,

    /// The task driving a call ended without reporting an outcome.
    #[error("API call task ended before settling")]
    CallAbandoned,
}

/// How an API call settled: the terminal lifecycle action that was forwarded.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// The success action, carrying `response`.
    Succeeded(Action),
    /// The failure action, carrying `error`.
    Failed(Action),
}

impl CallOutcome {
    /// The terminal action.
    #[must_use]
    pub const fn action(&self) -> &Action {
        match self {
            Self::Succeeded(action) | Self::Failed(action) => action,
        }
    }

    /// Take the terminal action.
    #[must_use]
    pub fn into_action(self) -> Action {
        match self {
            Self::Succeeded(action) | Self::Failed(action) => action,
        }
    }

    /// Whether the call succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }
}

/// Reports the outcome of an in-flight call to its [`CallHandle`].
#[derive(Debug)]
pub struct CallCompleter(oneshot::Sender<CallOutcome>);

impl CallCompleter {
    /// Report the outcome. Ignored if the handle was dropped.
    pub fn complete(self, outcome: CallOutcome) {
        let _ = self.0.send(outcome);
    }
}

/// Awaitable handle to an in-flight API call.
///
/// Dropping the handle does not cancel the call; the terminal action is
/// still forwarded.
#[derive(Debug)]
pub struct CallHandle {
    completion: oneshot::Receiver<CallOutcome>,
}

impl CallHandle {
    /// Create a connected completer/handle pair.
    #[must_use]
    pub fn pair() -> (CallCompleter, Self) {
        let (tx, rx) = oneshot::channel();
        (CallCompleter(tx), Self { completion: rx })
    }

    /// Wait for the call to settle.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::CallAbandoned`] if the completer was dropped
    /// without reporting (for example, the task panicked).
    pub async fn wait(self) -> Result<CallOutcome, DispatchError> {
        self.completion
            .await
            .map_err(|_| DispatchError::CallAbandoned)
    }
}

/// Result of dispatching an action.
#[derive(Debug)]
pub enum Dispatched {
    /// The action was fully processed synchronously.
    Done,
    /// An API call is in flight.
    Pending(CallHandle),
}

impl Dispatched {
    /// Whether asynchronous work is still running.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// Wait for any in-flight work. `None` for synchronous dispatches.
    ///
    /// # Errors
    ///
    /// See [`CallHandle::wait`].
    pub async fn settled(self) -> Result<Option<CallOutcome>, DispatchError> {
        match self {
            Self::Done => Ok(None),
            Self::Pending(handle) => handle.wait().await.map(Some),
        }
    }
}

type NextFn = dyn Fn(AnyAction) -> Result<Dispatched, DispatchError> + Send + Sync;

/// The remainder of the middleware chain.
///
/// Cheap to clone; middlewares move clones into spawned tasks to forward
/// actions later.
#[derive(Clone)]
pub struct Next(Arc<NextFn>);

impl Next {
    /// Wrap a function as a chain link.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(AnyAction) -> Result<Dispatched, DispatchError> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Forward an action down the chain.
    ///
    /// # Errors
    ///
    /// Whatever the downstream links return.
    pub fn call(&self, action: impl Into<AnyAction>) -> Result<Dispatched, DispatchError> {
        (self.0)(action.into())
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Next(<fn>)")
    }
}

/// An interceptor in the dispatch chain.
pub trait Middleware: Send + Sync {
    /// Handle one dispatched action.
    ///
    /// # Errors
    ///
    /// Implementations return an error to abort the dispatch; it propagates
    /// to whoever called `dispatch`.
    fn handle(&self, action: AnyAction, next: &Next) -> Result<Dispatched, DispatchError>;
}

/// Compose `middlewares` around `terminal`. The first middleware sees each
/// action first.
#[must_use]
pub fn chain(middlewares: &[Arc<dyn Middleware>], terminal: Next) -> Next {
    middlewares.iter().rev().fold(terminal, |next, middleware| {
        let middleware = Arc::clone(middleware);
        Next::new(move |action| middleware.handle(action, &next))
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::sync::Mutex;

    struct Tag {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Middleware for Tag {
        fn handle(&self, action: AnyAction, next: &Next) -> Result<Dispatched, DispatchError> {
            self.log.lock().unwrap().push(self.name.to_string());
            next.call(action)
        }
    }

    #[test]
    fn chain_runs_middlewares_in_order_then_terminal() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let terminal_log = Arc::clone(&log);
        let terminal = Next::new(move |action| {
            let kind = action.as_plain().map(|a| a.kind.clone()).unwrap_or_default();
            terminal_log.lock().unwrap().push(format!("reduce:{kind}"));
            Ok(Dispatched::Done)
        });

        let middlewares: Vec<Arc<dyn Middleware>> = vec![
            Arc::new(Tag {
                name: "first",
                log: Arc::clone(&log),
            }),
            Arc::new(Tag {
                name: "second",
                log: Arc::clone(&log),
            }),
        ];

        let next = chain(&middlewares, terminal);
        let dispatched = next.call(Action::new("PING")).unwrap();

        assert!(!dispatched.is_pending());
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "reduce:PING"]);
    }

    #[test]
    fn empty_chain_is_the_terminal() {
        let next = chain(&[], Next::new(|_| Err(DispatchError::UnhandledApiCall)));
        assert_eq!(
            next.call(Action::new("X")).unwrap_err(),
            DispatchError::UnhandledApiCall
        );
    }

    #[tokio::test]
    async fn handle_reports_outcome() {
        let (completer, handle) = CallHandle::pair();
        completer.complete(CallOutcome::Succeeded(Action::new("OK")));

        let outcome = Dispatched::Pending(handle).settled().await.unwrap().unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.action().kind, "OK");
    }

    #[tokio::test]
    async fn dropped_completer_is_abandoned() {
        let (completer, handle) = CallHandle::pair();
        drop(completer);
        assert_eq!(handle.wait().await.unwrap_err(), DispatchError::CallAbandoned);
    }

    #[test]
    fn handle_stays_pending_until_completed() {
        let (completer, handle) = CallHandle::pair();
        let mut wait = tokio_test::task::spawn(handle.wait());
        tokio_test::assert_pending!(wait.poll());

        completer.complete(CallOutcome::Failed(Action::new("FAIL")));
        assert!(wait.is_woken());
        let outcome = tokio_test::assert_ready_ok!(wait.poll());
        assert!(!outcome.is_success());
    }

    #[tokio::test]
    async fn done_settles_to_none() {
        assert!(Dispatched::Done.settled().await.unwrap().is_none());
    }
}
