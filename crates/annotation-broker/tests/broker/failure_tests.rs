// crates/annotation-broker/tests/broker/failure_tests.rs
// ============================================================================
// Module: Broker Transport Failure Tests
// Description: Tests for transport-level failures.
// Purpose: Validate that failures reset the UI without reaching the bus.
// Dependencies: annotation-broker, annotation-broker-core
// ============================================================================

//! ## Overview
//! Exercises the failure path of [`annotation_broker::Broker`].

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

use std::sync::Arc;

use annotation_broker::Broker;
use annotation_broker::EventBus;
use annotation_broker::RequestOptions;
use annotation_broker::RequestState;
use annotation_broker_core::Completion;
use annotation_broker_core::EventKind;
use annotation_broker_core::OutgoingRequest;
use annotation_broker_core::RequestPayload;
use annotation_broker_core::Transport;
use annotation_broker_core::TransportError;

use super::common::Harness;
use super::common::TEST_ENDPOINT;
use super::common::recorder;

/// Transport that drops every completion unresolved.
struct DroppingTransport;

impl Transport for DroppingTransport {
    fn send(&self, _request: OutgoingRequest, completion: Completion) {
        drop(completion);
    }
}

/// Tests a transport failure unspins, closes the waiter, and publishes nothing.
#[test]
fn transport_failure_resets_ui_silently() {
    let mut harness = Harness::new();
    let (callback, received) = recorder();
    let id = harness.broker.submit(
        RequestPayload::new("getDocument"),
        Some(callback),
        RequestOptions::new(),
    );
    assert!(harness.transport.fail(id, TransportError::Status(500)));

    assert_eq!(harness.broker.pump()[0].state, RequestState::TransportFailed);
    assert_eq!(harness.kinds(), vec![EventKind::Spin, EventKind::Unspin]);
    assert_eq!(harness.waiter.closes(), 1);
    assert_eq!(harness.bus.run_deferred(), 0);
    assert!(received.lock().unwrap().is_empty());
    assert!(!harness.broker.is_pending(id));
    assert!(harness.broker.is_reload_safe());
}

/// Tests a failure on an obsolete request is handled the same way.
#[test]
fn obsolete_transport_failure_still_unspins() {
    let mut harness = Harness::new();
    let id = harness.broker.submit(RequestPayload::new("getDocument"), None, RequestOptions::new());
    harness.broker.invalidate(true);
    harness.transport.fail(id, TransportError::Request("connection reset".to_string()));

    assert_eq!(harness.broker.pump()[0].state, RequestState::TransportFailed);
    assert_eq!(harness.count(EventKind::Unspin), 1);
    assert_eq!(harness.waiter.closes(), 1);
}

/// Tests a completion dropped by the transport resolves as a failure.
#[test]
fn dropped_completion_resolves_as_failure() {
    let bus = Arc::new(EventBus::new());
    let mut broker = Broker::builder()
        .endpoint(TEST_ENDPOINT)
        .dispatcher(Arc::clone(&bus))
        .transport(Arc::new(DroppingTransport))
        .build()
        .expect("broker builds");

    broker.submit(RequestPayload::new("getDocument"), None, RequestOptions::new());
    let resolved = broker.pump();
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].state, RequestState::TransportFailed);
    assert!(broker.is_reload_safe());
}

/// Tests resolving an unknown id through the queued transport is rejected.
#[test]
fn queued_transport_rejects_unknown_ids() {
    let mut harness = Harness::new();
    let id = harness.broker.submit(RequestPayload::new("getDocument"), None, RequestOptions::new());
    assert!(harness.transport.fail(id, TransportError::Abandoned));
    assert!(!harness.transport.fail(id, TransportError::Abandoned));
    assert_eq!(harness.broker.pump().len(), 1);
    assert!(harness.broker.pump().is_empty());
}
