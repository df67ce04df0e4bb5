//! Metric names recorded by the middleware and the store.
//!
//! Recording goes through the `metrics` facade; install any recorder
//! (Prometheus, statsd, ...) in the application to collect them. Without a
//! recorder the calls are no-ops.

use metrics::{Unit, describe_counter, describe_histogram};

/// API-call actions accepted by the middleware.
pub const CALLS_TOTAL: &str = "api_middleware.calls.total";

/// Calls that ended with a success action.
pub const CALLS_SUCCEEDED: &str = "api_middleware.calls.succeeded";

/// Calls that ended with a failure action.
pub const CALLS_FAILED: &str = "api_middleware.calls.failed";

/// Time from the request action to the terminal action.
pub const CALL_DURATION: &str = "api_middleware.call.duration_seconds";

/// API-call actions rejected for a malformed descriptor.
pub const DESCRIPTOR_REJECTED: &str = "api_middleware.descriptor.rejected";

/// Plain actions reduced by a store.
pub const STORE_ACTIONS_TOTAL: &str = "store.actions.total";

/// Register metric descriptions with the installed recorder.
pub fn describe_metrics() {
    describe_counter!(CALLS_TOTAL, "API-call actions accepted by the middleware");
    describe_counter!(CALLS_SUCCEEDED, "API calls that dispatched a success action");
    describe_counter!(CALLS_FAILED, "API calls that dispatched a failure action");
    describe_histogram!(
        CALL_DURATION,
        Unit::Seconds,
        "Time between the request action and the terminal action"
    );
    describe_counter!(
        DESCRIPTOR_REJECTED,
        "API-call actions rejected because of a malformed descriptor"
    );
    describe_counter!(STORE_ACTIONS_TOTAL, "Plain actions reduced by a store");
}
