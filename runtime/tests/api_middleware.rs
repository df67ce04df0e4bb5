//! Integration tests for the API middleware contract
//!
//! Drives `ApiMiddleware::handle` directly against a recording chain and a
//! mock transport.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use call_api_core::descriptor::{ConfigError, DescriptorError};
use call_api_core::middleware::{CallOutcome, DispatchError, Middleware};
use call_api_core::schema::{Entity, Schema};
use call_api_core::transport::TransportError;
use call_api_core::{Action, AnyAction, ApiAction, CallApi};
use call_api_runtime::{ApiConfig, ApiMiddleware};
use call_api_testing::{MockTransport, RecordingNext, assertions};
use serde_json::json;
use std::sync::Arc;

// ============================================================================
// Test Fixtures
// ============================================================================

const BASE: &str = "https://api.spotify.com/v1/";
const TYPES: [&str; 3] = ["ALBUM_REQUEST", "ALBUM_SUCCESS", "ALBUM_FAILURE"];

fn middleware(transport: &MockTransport) -> ApiMiddleware {
    ApiMiddleware::new(ApiConfig::default(), Arc::new(transport.clone()))
}

fn fetch_album(endpoint: &str) -> AnyAction {
    ApiAction::new(CallApi::new(endpoint, TYPES))
        .with_field("albumId", json!("123"))
        .into()
}

fn album_schema() -> Schema {
    let track = Entity::new("tracks");
    let album = Entity::new("albums");
    album.define([("tracks", Schema::array(track))]).unwrap();
    album.into()
}

// ============================================================================
// Passthrough
// ============================================================================

#[tokio::test]
async fn plain_action_passes_through_untouched() {
    let transport = MockTransport::new();
    let recorder = RecordingNext::new();

    let action = Action::new("SET_FILTER").with_field("filter", json!("rock"));
    let dispatched = middleware(&transport)
        .handle(action.clone().into(), &recorder.next())
        .unwrap();

    assert!(!dispatched.is_pending());
    assert_eq!(recorder.plain_actions(), vec![action]);
    assert_eq!(transport.request_count(), 0);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn request_is_forwarded_before_the_call_settles() {
    let transport = MockTransport::new();
    let gate =
        transport.respond_json_gated(&format!("{BASE}albums/123"), 200, json!({"id": "123"}));
    let recorder = RecordingNext::new();

    let dispatched = middleware(&transport)
        .handle(fetch_album("albums/123"), &recorder.next())
        .unwrap();

    // Only the request action so far, and it carries the original fields.
    let seen = recorder.plain_actions();
    assertions::assert_kinds(&seen, &["ALBUM_REQUEST"]);
    assert_eq!(seen[0].get("albumId"), Some(&json!("123")));
    assert!(seen[0].response().is_none());

    gate.open();
    let outcome = dispatched.settled().await.unwrap().unwrap();
    assert!(outcome.is_success());
    assertions::assert_kinds(&recorder.plain_actions(), &["ALBUM_REQUEST", "ALBUM_SUCCESS"]);
}

#[tokio::test]
async fn success_response_is_camelized() {
    let transport = MockTransport::new();
    transport.respond_json(
        &format!("{BASE}albums/123"),
        200,
        json!({"album_name": "X", "release_year": 1999}),
    );
    let recorder = RecordingNext::new();

    let outcome = middleware(&transport)
        .handle(fetch_album("albums/123"), &recorder.next())
        .unwrap()
        .settled()
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        assertions::assert_success(&outcome),
        &json!({"albumName": "X", "releaseYear": 1999})
    );
    let success = outcome.action();
    assert_eq!(success.kind, "ALBUM_SUCCESS");
    assert_eq!(success.get("albumId"), Some(&json!("123")));
    assert_eq!(recorder.plain_actions().last(), Some(success));
}

#[tokio::test]
async fn success_response_is_normalized_with_schema() {
    let transport = MockTransport::new();
    transport.respond_json(
        &format!("{BASE}albums/a1"),
        200,
        json!({
            "id": "a1",
            "album_name": "Album",
            "tracks": [
                {"id": "t1", "track_number": 1},
                {"id": "t2", "track_number": 2}
            ]
        }),
    );
    let recorder = RecordingNext::new();
    let action = ApiAction::new(CallApi::new("albums/a1", TYPES).with_schema(album_schema()));

    let outcome = middleware(&transport)
        .handle(action.into(), &recorder.next())
        .unwrap()
        .settled()
        .await
        .unwrap()
        .unwrap();

    let response = assertions::assert_success(&outcome);
    assert_eq!(response["result"], json!("a1"));
    assert_eq!(
        response["entities"]["albums"]["a1"],
        json!({"id": "a1", "albumName": "Album", "tracks": ["t1", "t2"]})
    );
    assert_eq!(
        response["entities"]["tracks"]["t2"],
        json!({"id": "t2", "trackNumber": 2})
    );
}

#[tokio::test]
async fn error_status_becomes_failure_with_body() {
    let transport = MockTransport::new();
    transport.respond_json(&format!("{BASE}albums/404"), 404, json!({"error": "not found"}));
    let recorder = RecordingNext::new();

    let outcome = middleware(&transport)
        .handle(fetch_album("albums/404"), &recorder.next())
        .unwrap()
        .settled()
        .await
        .unwrap()
        .unwrap();

    assert_eq!(outcome.action().kind, "ALBUM_FAILURE");
    assert_eq!(assertions::assert_failure(&outcome), &json!({"error": "not found"}));
    assert!(outcome.action().response().is_none());
    assertions::assert_kinds(&recorder.plain_actions(), &["ALBUM_REQUEST", "ALBUM_FAILURE"]);
}

#[tokio::test]
async fn network_failure_becomes_failure_action() {
    let transport = MockTransport::new();
    transport.fail(
        &format!("{BASE}albums/123"),
        TransportError::Request("dns error".to_string()),
    );
    let recorder = RecordingNext::new();

    let outcome = middleware(&transport)
        .handle(fetch_album("albums/123"), &recorder.next())
        .unwrap()
        .settled()
        .await
        .unwrap()
        .unwrap();

    let error = assertions::assert_failure(&outcome);
    assert_eq!(error["name"], json!("NetworkFailure"));
    assert_eq!(recorder.len(), 2);
}

// ============================================================================
// URL resolution
// ============================================================================

#[tokio::test]
async fn relative_endpoint_is_prefixed_with_base_url() {
    let transport = MockTransport::new();
    transport.respond_json("https://api.spotify.com/v1/albums/123", 200, json!({}));

    middleware(&transport)
        .handle(fetch_album("albums/123"), &RecordingNext::new().next())
        .unwrap()
        .settled()
        .await
        .unwrap();

    assert_eq!(transport.requests(), vec!["https://api.spotify.com/v1/albums/123"]);
}

#[tokio::test]
async fn absolute_endpoint_is_used_verbatim() {
    let url = "https://api.spotify.com/v1/albums/123/tracks?offset=50";
    let transport = MockTransport::new();
    transport.respond_json(url, 200, json!({"items": []}));

    middleware(&transport)
        .handle(fetch_album(url), &RecordingNext::new().next())
        .unwrap()
        .settled()
        .await
        .unwrap();

    assert_eq!(transport.requests(), vec![url]);
}

// ============================================================================
// Descriptor validation
// ============================================================================

#[tokio::test]
async fn two_types_fail_synchronously_and_forward_nothing() {
    let transport = MockTransport::new();
    let recorder = RecordingNext::new();
    let action = ApiAction::new(CallApi::from_raw(json!("albums/1"), json!(["A", "B"])));

    let err = middleware(&transport)
        .handle(action.into(), &recorder.next())
        .unwrap_err();

    assert_eq!(
        err,
        DispatchError::Descriptor(DescriptorError::Config(ConfigError::TypesWrongLength {
            len: 2
        }))
    );
    assert!(recorder.is_empty());
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn numeric_endpoint_fails_synchronously() {
    let transport = MockTransport::new();
    let recorder = RecordingNext::new();
    let action = ApiAction::new(CallApi::from_raw(json!(42), json!(["A", "B", "C"])));

    let err = middleware(&transport)
        .handle(action.into(), &recorder.next())
        .unwrap_err();

    assert!(matches!(
        err,
        DispatchError::Descriptor(DescriptorError::Config(ConfigError::EndpointNotString { .. }))
    ));
    assert!(recorder.is_empty());
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn non_string_type_fails_with_its_own_kind() {
    let recorder = RecordingNext::new();
    let action = ApiAction::new(CallApi::from_raw(json!("albums"), json!(["A", null, "C"])));

    let err = middleware(&MockTransport::new())
        .handle(action.into(), &recorder.next())
        .unwrap_err();

    assert!(matches!(
        err,
        DispatchError::Descriptor(DescriptorError::NonStringType { index: 1, .. })
    ));
    assert!(recorder.is_empty());
}

// ============================================================================
// Runtime requirements
// ============================================================================

#[test]
fn dispatch_outside_a_runtime_forwards_nothing() {
    let recorder = RecordingNext::new();
    let err = middleware(&MockTransport::new())
        .handle(fetch_album("albums/123"), &recorder.next())
        .unwrap_err();

    assert_eq!(err, DispatchError::NoRuntime);
    assert!(recorder.is_empty());
}

#[tokio::test]
async fn dropping_the_handle_does_not_cancel_the_call() {
    let transport = MockTransport::new();
    transport.respond_json(&format!("{BASE}albums/123"), 200, json!({}));
    let recorder = RecordingNext::new();

    drop(
        middleware(&transport)
            .handle(fetch_album("albums/123"), &recorder.next())
            .unwrap(),
    );

    for _ in 0..100 {
        if recorder.len() == 2 {
            break;
        }
        tokio::task::yield_now().await;
    }
    assertions::assert_kinds(&recorder.plain_actions(), &["ALBUM_REQUEST", "ALBUM_SUCCESS"]);
}

#[tokio::test]
async fn outcome_variant_matches_terminal_action() {
    let transport = MockTransport::new();
    transport.respond_json(&format!("{BASE}albums/1"), 500, json!({"status": 500}));

    let outcome = middleware(&transport)
        .handle(fetch_album("albums/1"), &RecordingNext::new().next())
        .unwrap()
        .settled()
        .await
        .unwrap()
        .unwrap();

    assert!(matches!(outcome, CallOutcome::Failed(ref a) if a.kind == "ALBUM_FAILURE"));
}
