//! In-memory transport and chain doubles
//!
//! - [`MockTransport`]: canned responses per URL, with request recording and
//!   optional gates to control when a response is released
//! - [`RecordingNext`]: a terminal chain link that records what it receives

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Test utilities document panics where critical

use call_api_core::action::{Action, AnyAction};
use call_api_core::middleware::{Dispatched, Next};
use call_api_core::transport::{FetchFuture, Transport, TransportError, TransportResponse};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// Releases one gated response when opened (or dropped).
#[derive(Debug)]
pub struct Gate(oneshot::Sender<()>);

impl Gate {
    /// Let the gated response through.
    pub fn open(self) {
        let _ = self.0.send(());
    }
}

struct Reply {
    result: Result<TransportResponse, TransportError>,
    gate: Option<oneshot::Receiver<()>>,
}

#[derive(Default)]
struct MockState {
    replies: HashMap<String, VecDeque<Reply>>,
    requests: Vec<String>,
}

/// Transport returning canned responses.
///
/// Replies are queued per URL and consumed in order. A URL with no queued
/// reply fails like an unreachable host. Clones share state, so keep one to
/// inspect requests after handing the other to a middleware.
///
/// # Example
///
/// ```
/// use call_api_core::transport::Transport;
/// use call_api_testing::MockTransport;
/// use serde_json::json;
///
/// # async fn example() {
/// let transport = MockTransport::new();
/// transport.respond_json("https://api.test/v1/albums/1", 200, json!({"id": "1"}));
///
/// let response = transport.fetch("https://api.test/v1/albums/1").await.unwrap();
/// assert!(response.ok());
/// assert_eq!(transport.requests(), vec!["https://api.test/v1/albums/1"]);
/// # }
/// ```
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a transport with no replies queued
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, url: &str, reply: Reply) {
        self.state
            .lock()
            .unwrap()
            .replies
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
    }

    /// Queue a response for `url`
    pub fn respond(&self, url: &str, response: TransportResponse) -> &Self {
        self.push(
            url,
            Reply {
                result: Ok(response),
                gate: None,
            },
        );
        self
    }

    /// Queue a JSON response for `url`
    pub fn respond_json(&self, url: &str, status: u16, body: Value) -> &Self {
        self.respond(url, TransportResponse::json_body(status, &body))
    }

    /// Queue a transport failure for `url`
    pub fn fail(&self, url: &str, error: TransportError) -> &Self {
        self.push(
            url,
            Reply {
                result: Err(error),
                gate: None,
            },
        );
        self
    }

    /// Queue a JSON response that is held back until the returned [`Gate`]
    /// is opened
    #[must_use]
    pub fn respond_json_gated(&self, url: &str, status: u16, body: Value) -> Gate {
        let (tx, rx) = oneshot::channel();
        self.push(
            url,
            Reply {
                result: Ok(TransportResponse::json_body(status, &body)),
                gate: Some(rx),
            },
        );
        Gate(tx)
    }

    /// Every URL fetched so far, in order
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Number of fetches so far
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }
}

impl Transport for MockTransport {
    fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a> {
        let reply = {
            let mut state = self.state.lock().unwrap();
            state.requests.push(url.to_string());
            state.replies.get_mut(url).and_then(VecDeque::pop_front)
        };

        Box::pin(async move {
            let Some(reply) = reply else {
                return Err(TransportError::Request(format!(
                    "no mock response for {url}"
                )));
            };
            if let Some(gate) = reply.gate {
                // A dropped gate releases the response too.
                let _ = gate.await;
            }
            reply.result
        })
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("requests", &self.request_count())
            .finish_non_exhaustive()
    }
}

/// Terminal chain link that records every action it receives.
///
/// # Example
///
/// ```
/// use call_api_core::action::Action;
/// use call_api_testing::RecordingNext;
///
/// let recorder = RecordingNext::new();
/// recorder.next().call(Action::new("PING")).unwrap();
/// assert_eq!(recorder.kinds(), vec!["PING"]);
/// ```
#[derive(Clone, Default, Debug)]
pub struct RecordingNext {
    actions: Arc<Mutex<Vec<AnyAction>>>,
}

impl RecordingNext {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A [`Next`] that records and reports [`Dispatched::Done`]
    #[must_use]
    pub fn next(&self) -> Next {
        let actions = Arc::clone(&self.actions);
        Next::new(move |action| {
            actions.lock().unwrap().push(action);
            Ok(Dispatched::Done)
        })
    }

    /// Everything received, in order
    #[must_use]
    pub fn actions(&self) -> Vec<AnyAction> {
        self.actions.lock().unwrap().clone()
    }

    /// The plain actions received, in order
    #[must_use]
    pub fn plain_actions(&self) -> Vec<Action> {
        self.actions
            .lock()
            .unwrap()
            .iter()
            .filter_map(AnyAction::as_plain)
            .cloned()
            .collect()
    }

    /// Types of the plain actions received, in order
    #[must_use]
    pub fn kinds(&self) -> Vec<String> {
        self.plain_actions().into_iter().map(|a| a.kind).collect()
    }

    /// Number of actions received
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.lock().unwrap().len()
    }

    /// Whether nothing was received
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
