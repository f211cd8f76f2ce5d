// crates/annotation-broker/tests/broker/counter_proptest.rs
// ============================================================================
// Module: Broker Counter Property Tests
// Description: Property tests for the in-flight counter.
// Purpose: Ensure the counter equals submissions minus resolutions for any interleaving.
// Dependencies: annotation-broker, annotation-broker-core, proptest
// ============================================================================

//! ## Overview
//! Drives a broker through random interleavings of submissions, successes,
//! failures, and invalidations.

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
use annotation_broker_core::RequestPayload;
use annotation_broker_core::ResponseEnvelope;
use annotation_broker_core::ServerException;
use annotation_broker_core::TransportError;
use proptest::prelude::*;

use super::common::Harness;

/// Operation applied to the broker.
#[derive(Debug, Clone)]
enum Op {
    /// Submit a request with the given keep flag.
    Submit(bool),
    /// Resolve the n-th parked call successfully.
    Resolve(usize, u8),
    /// Fail the n-th parked call.
    Fail(usize),
    /// Invalidate pending requests.
    Invalidate(bool),
}

/// Strategy over broker operations.
fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => any::<bool>().prop_map(Op::Submit),
        3 => (any::<usize>(), 0u8..4).prop_map(|(index, shape)| Op::Resolve(index, shape)),
        1 => any::<usize>().prop_map(Op::Fail),
        1 => any::<bool>().prop_map(Op::Invalidate),
    ]
}

/// Builds a response of one of several shapes.
fn response(shape: u8) -> ResponseEnvelope {
    match shape {
        0 => ResponseEnvelope::for_action("getDocument"),
        1 => ResponseEnvelope::for_action("getDocumentX"),
        2 => {
            ResponseEnvelope::for_action("getDocument").with_exception(ServerException::Suppressed)
        }
        _ => ResponseEnvelope::for_action("getDocument")
            .with_exception(ServerException::Unrecognized("other".to_string())),
    }
}

proptest! {
    #[test]
    fn in_flight_counter_tracks_unresolved_requests(
        ops in prop::collection::vec(op_strategy(), 0..64),
    ) {
        let mut harness = Harness::new();
        let mut submitted = 0usize;
        let mut resolved = 0usize;
        for op in ops {
            match op {
                Op::Submit(keep) => {
                    harness.broker.submit(
                        RequestPayload::new("getDocument"),
                        None,
                        RequestOptions::new().keep(keep),
                    );
                    submitted += 1;
                }
                Op::Resolve(index, shape) => {
                    let ids = harness.transport.pending_ids();
                    if !ids.is_empty() {
                        harness.transport.resolve(ids[index % ids.len()], response(shape));
                    }
                }
                Op::Fail(index) => {
                    let ids = harness.transport.pending_ids();
                    if !ids.is_empty() {
                        harness.transport.fail(ids[index % ids.len()], TransportError::Status(502));
                    }
                }
                Op::Invalidate(all) => {
                    harness.broker.invalidate(all);
                }
            }
            resolved += harness.broker.pump().len();
            prop_assert_eq!(harness.broker.in_flight(), submitted - resolved);
            prop_assert_eq!(harness.broker.is_reload_safe(), submitted == resolved);
            prop_assert!(harness.broker.pending_len() <= harness.broker.in_flight());
        }
    }
}
