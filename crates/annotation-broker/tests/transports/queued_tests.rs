// crates/annotation-broker/tests/transports/queued_tests.rs
// ============================================================================
// Module: QueuedTransport Tests
// Description: Tests for the host-resolved transport.
// Purpose: Validate parking, lookup, and resolution by id.
// Dependencies: annotation-broker, annotation-broker-core
// ============================================================================

//! ## Overview
//! Exercises [`annotation_broker::QueuedTransport`] directly.

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
use std::sync::Mutex;

use annotation_broker::QueuedTransport;
use annotation_broker_core::ActionName;
use annotation_broker_core::Completion;
use annotation_broker_core::OutgoingRequest;
use annotation_broker_core::RequestId;
use annotation_broker_core::ResponseEnvelope;
use annotation_broker_core::Transport;
use annotation_broker_core::TransportError;
use annotation_broker_core::TransportOutcome;

/// Parks a request with a recording completion.
fn park(transport: &QueuedTransport, id: u64, outcomes: &Arc<Mutex<Vec<(u64, TransportOutcome)>>>) {
    let sink = Arc::clone(outcomes);
    transport.send(
        OutgoingRequest {
            request_id: RequestId::new(id),
            action: ActionName::new("getDocument"),
            url: "http://localhost/ajax.cgi".to_string(),
            body: format!("action=getDocument&n={id}"),
        },
        Completion::new(move |outcome| sink.lock().unwrap().push((id, outcome))),
    );
}

/// Tests calls park until resolved, in any order.
#[test]
fn queued_transport_resolves_in_any_order() {
    let transport = QueuedTransport::new();
    let outcomes = Arc::new(Mutex::new(Vec::new()));
    park(&transport, 0, &outcomes);
    park(&transport, 1, &outcomes);

    assert_eq!(transport.len(), 2);
    assert_eq!(transport.pending_ids(), vec![RequestId::new(0), RequestId::new(1)]);
    assert_eq!(transport.request(RequestId::new(1)).unwrap().body, "action=getDocument&n=1");
    assert!(outcomes.lock().unwrap().is_empty());

    assert!(transport.fail(RequestId::new(1), TransportError::Status(404)));
    assert!(transport.resolve(RequestId::new(0), ResponseEnvelope::for_action("getDocument")));
    assert!(transport.is_empty());

    let outcomes = outcomes.lock().unwrap();
    assert_eq!(outcomes[0], (1, Err(TransportError::Status(404))));
    assert_eq!(outcomes[1].0, 0);
    assert!(outcomes[1].1.is_ok());
}

/// Tests resolving an id that is not parked reports false.
#[test]
fn queued_transport_rejects_unknown_id() {
    let transport = QueuedTransport::new();
    assert!(!transport.resolve(RequestId::new(9), ResponseEnvelope::default()));
    assert!(transport.request(RequestId::new(9)).is_none());
}

/// Tests dropping the transport abandons parked calls.
#[test]
fn dropping_transport_abandons_parked_calls() {
    let transport = QueuedTransport::new();
    let outcomes = Arc::new(Mutex::new(Vec::new()));
    park(&transport, 4, &outcomes);
    drop(transport);

    assert_eq!(*outcomes.lock().unwrap(), vec![(4, Err(TransportError::Abandoned))]);
}
