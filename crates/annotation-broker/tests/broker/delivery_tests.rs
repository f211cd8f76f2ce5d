// crates/annotation-broker/tests/broker/delivery_tests.rs
// ============================================================================
// Module: Broker Delivery Tests
// Description: Tests for successful response delivery.
// Purpose: Validate id allocation, deferred callbacks, merging, and mismatch handling.
// Dependencies: annotation-broker, annotation-broker-core, serde_json
// ============================================================================

//! ## Overview
//! Exercises the success path of [`annotation_broker::Broker`].

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use annotation_broker::RequestOptions;
use annotation_broker::RequestState;
use annotation_broker::ResolvedRequest;
use annotation_broker_core::ActionName;
use annotation_broker_core::BusEvent;
use annotation_broker_core::EventKind;
use annotation_broker_core::Message;
use annotation_broker_core::ProtocolVersion;
use annotation_broker_core::ReloadDecision;
use annotation_broker_core::RequestId;
use annotation_broker_core::RequestPayload;
use annotation_broker_core::ResponseEnvelope;
use annotation_broker_core::ServerException;
use annotation_broker_core::Severity;
use serde_json::json;

use super::common::Harness;
use super::common::recorder;

// ============================================================================
// SECTION: Submission
// ============================================================================

/// Tests the first request gets id 0 and posts spin before any transport work.
#[test]
fn first_submission_gets_id_zero_and_spins() {
    let mut harness = Harness::new();
    let id = harness.broker.submit(RequestPayload::new("getDocument"), None, RequestOptions::new());

    assert_eq!(id, RequestId::new(0));
    assert_eq!(harness.events(), vec![BusEvent::Spin]);
    assert_eq!(harness.broker.in_flight(), 1);
    assert!(harness.broker.is_pending(id));
    assert_eq!(harness.transport.pending_ids(), vec![id]);

    let second = harness.broker.submit(
        RequestPayload::new("getDocument"),
        None,
        RequestOptions::new(),
    );
    assert_eq!(second, RequestId::new(1));
}

/// Tests the outgoing body carries action and the configured protocol version.
#[test]
fn submission_fills_protocol_version() {
    let version = ProtocolVersion::from_raw(3).unwrap();
    let mut harness = Harness::build(ReloadDecision::Decline, version);
    let payload = RequestPayload::new("getDocument").with_field("document", "doc1");
    let id = harness.broker.submit(payload, None, RequestOptions::new());

    let request = harness.transport.request(id).unwrap();
    assert_eq!(request.action, ActionName::new("getDocument"));
    assert_eq!(request.url, super::common::TEST_ENDPOINT);
    assert_eq!(request.body, "action=getDocument&protocol=3&document=doc1");
}

/// Tests a payload that already names a protocol version keeps it.
#[test]
fn submission_keeps_explicit_protocol_version() {
    let mut harness = Harness::new();
    let payload =
        RequestPayload::new("getDocument").with_protocol(ProtocolVersion::from_raw(7).unwrap());
    let id = harness.broker.submit(payload, None, RequestOptions::new());

    let request = harness.transport.request(id).unwrap();
    assert_eq!(request.body, "action=getDocument&protocol=7");
}

// ============================================================================
// SECTION: Delivery
// ============================================================================

/// Tests a matching response invokes the callback once, deferred, with merged fields.
#[test]
fn matching_response_delivers_merged_envelope_once() {
    let mut harness = Harness::new();
    let (callback, received) = recorder();
    let options = RequestOptions::new().merge_field("collection", "/news/");
    let id = harness.broker.submit(RequestPayload::new("getDocument"), Some(callback), options);

    let envelope = ResponseEnvelope::for_action("getDocument").with_field("text", "Hello");
    assert!(harness.transport.resolve(id, envelope));

    let resolved = harness.broker.pump();
    assert_eq!(
        resolved,
        vec![ResolvedRequest {
            id,
            state: RequestState::Delivered,
        }]
    );
    assert!(received.lock().unwrap().is_empty(), "callback must not run inline");
    assert_eq!(harness.bus.run_deferred(), 1);

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].fields["collection"], json!("/news/"));
    assert_eq!(received[0].fields["text"], json!("Hello"));
    assert_eq!(
        harness.kinds(),
        vec![EventKind::Spin, EventKind::Messages, EventKind::Unspin]
    );
    assert!(!harness.broker.is_pending(id));
    assert!(harness.broker.is_reload_safe());
}

/// Tests server messages are published before the callback is scheduled.
#[test]
fn server_messages_are_published() {
    let mut harness = Harness::new();
    let id = harness.broker.submit(RequestPayload::new("saveSpan"), None, RequestOptions::new());
    let message = Message::new("Saved", Severity::Comment, 2000);
    harness
        .transport
        .resolve(id, ResponseEnvelope::for_action("saveSpan").with_message(message.clone()));

    harness.broker.pump();
    assert_eq!(harness.messages(), vec![message]);
    assert_eq!(harness.waiter.closes(), 0);
}

/// Tests a request without a callback still completes cleanly.
#[test]
fn response_without_callback_schedules_nothing() {
    let mut harness = Harness::new();
    let id = harness.broker.submit(RequestPayload::new("getDocument"), None, RequestOptions::new());
    harness.transport.resolve(id, ResponseEnvelope::for_action("getDocument"));

    assert_eq!(harness.broker.pump()[0].state, RequestState::Delivered);
    assert_eq!(harness.bus.deferred_len(), 0);
    assert_eq!(harness.count(EventKind::Unspin), 1);
}

/// Tests responses resolving out of order reach their own callbacks.
#[test]
fn out_of_order_resolutions_reach_their_callbacks() {
    let mut harness = Harness::new();
    let (first_cb, first) = recorder();
    let (second_cb, second) = recorder();
    let a = harness.broker.submit(
        RequestPayload::new("getDocument"),
        Some(first_cb),
        RequestOptions::new().merge_field("tag", "a"),
    );
    let b = harness.broker.submit(
        RequestPayload::new("getCollection"),
        Some(second_cb),
        RequestOptions::new().merge_field("tag", "b"),
    );

    harness.transport.resolve(b, ResponseEnvelope::for_action("getCollection"));
    harness.transport.resolve(a, ResponseEnvelope::for_action("getDocument"));
    let order: Vec<RequestId> = harness.broker.pump().into_iter().map(|done| done.id).collect();
    assert_eq!(order, vec![b, a]);
    harness.bus.run_deferred();

    assert_eq!(first.lock().unwrap()[0].fields["tag"], json!("a"));
    assert_eq!(second.lock().unwrap()[0].fields["tag"], json!("b"));
}

/// Tests an unrecognized exception value is delivered to the callback as-is.
#[test]
fn unrecognized_exception_is_delivered() {
    let mut harness = Harness::new();
    let (callback, received) = recorder();
    let id = harness.broker.submit(
        RequestPayload::new("getDocument"),
        Some(callback),
        RequestOptions::new(),
    );
    let envelope = ResponseEnvelope::for_action("getDocument")
        .with_exception(ServerException::Unrecognized("annotationFileNotFound".to_string()));
    harness.transport.resolve(id, envelope);

    assert_eq!(harness.broker.pump()[0].state, RequestState::Delivered);
    harness.bus.run_deferred();
    assert_eq!(
        received.lock().unwrap()[0].exception,
        ServerException::Unrecognized("annotationFileNotFound".to_string())
    );
    assert_eq!(harness.waiter.closes(), 0);
}

/// Tests a decoded response with messages the UI may not know still reaches its callback.
#[test]
fn unusual_server_messages_do_not_block_delivery() {
    let mut harness = Harness::new();
    let (callback, received) = recorder();
    let id = harness.broker.submit(
        RequestPayload::new("getDocument"),
        Some(callback),
        RequestOptions::new(),
    );
    let envelope = ResponseEnvelope::from_slice(
        br#"{"action":"getDocument","messages":[["ok","success",2.5]],"text":"x"}"#,
    )
    .unwrap();
    harness.transport.resolve(id, envelope);

    assert_eq!(harness.broker.pump()[0].state, RequestState::Delivered);
    let messages = harness.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].severity, Severity::Other("success".to_string()));
    assert_eq!(harness.bus.run_deferred(), 1);
    assert_eq!(received.lock().unwrap()[0].fields["text"], json!("x"));
}

// ============================================================================
// SECTION: Action Mismatch
// ============================================================================

/// Tests a response echoing another action is suppressed with a protocol error.
#[test]
fn mismatched_action_is_suppressed_with_protocol_error() {
    let mut harness = Harness::new();
    let (callback, received) = recorder();
    let id = harness.broker.submit(
        RequestPayload::new("getDocument"),
        Some(callback),
        RequestOptions::new(),
    );
    harness.transport.resolve(id, ResponseEnvelope::for_action("getDocumentX"));

    assert_eq!(harness.broker.pump()[0].state, RequestState::SuppressedException);
    assert_eq!(harness.bus.run_deferred(), 0);
    assert!(received.lock().unwrap().is_empty());

    let messages = harness.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].text.starts_with("Protocol error"));
    assert!(messages[0].text.contains("getDocumentX"));
    assert_eq!(messages[0].severity, Severity::Error);
    assert!(messages[0].is_sticky());
    let wire = serde_json::to_value(&messages[0]).unwrap();
    assert_eq!(wire[1], json!("error"));
    assert_eq!(wire[2], json!(-1));
    assert_eq!(harness.waiter.closes(), 1);
    assert_eq!(harness.count(EventKind::Unspin), 1);
}

/// Tests a response with no action at all counts as a mismatch.
#[test]
fn missing_action_is_a_mismatch() {
    let mut harness = Harness::new();
    let id = harness.broker.submit(RequestPayload::new("getDocument"), None, RequestOptions::new());
    harness.transport.resolve(id, ResponseEnvelope::default());

    assert_eq!(harness.broker.pump()[0].state, RequestState::SuppressedException);
    assert!(harness.messages()[0].text.starts_with("Protocol error"));
}

/// Tests an explicit `false` exception skips the echo check and reaches the callback.
#[test]
fn false_exception_skips_action_check() {
    let mut harness = Harness::new();
    let (callback, received) = recorder();
    let id = harness.broker.submit(
        RequestPayload::new("getDocument"),
        Some(callback),
        RequestOptions::new(),
    );
    let envelope = ResponseEnvelope::from_value(
        json!({"action": "getDocumentX", "messages": [], "exception": false}),
    )
    .unwrap();
    harness.transport.resolve(id, envelope);

    assert_eq!(harness.broker.pump()[0].state, RequestState::Delivered);
    assert!(harness.messages().is_empty());
    assert_eq!(harness.bus.run_deferred(), 1);
    assert_eq!(received.lock().unwrap().len(), 1);
    assert_eq!(harness.waiter.closes(), 0);
}

/// Tests an exception response skips the action check.
#[test]
fn exception_response_skips_action_check() {
    let mut harness = Harness::new();
    let id = harness.broker.submit(RequestPayload::new("getDocument"), None, RequestOptions::new());
    let envelope = ResponseEnvelope::default().with_exception(ServerException::Suppressed);
    harness.transport.resolve(id, envelope);

    assert_eq!(harness.broker.pump()[0].state, RequestState::SuppressedException);
    assert!(harness.messages().is_empty());
}
