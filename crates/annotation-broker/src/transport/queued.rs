// crates/annotation-broker/src/transport/queued.rs
// ============================================================================
// Module: Annotation Broker Queued Transport
// Description: Transport that parks calls until the host resolves them.
// Purpose: Let embedding hosts and tests decide when and how each call ends.
// Dependencies: annotation-broker-core
// ============================================================================

//! ## Overview
//! `QueuedTransport` stores every sent request with its [`Completion`]. The
//! host later resolves calls by id, in any order. Dropping the transport
//! drops the parked completions, which resolve as abandoned.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::PoisonError;

use annotation_broker_core::Completion;
use annotation_broker_core::OutgoingRequest;
use annotation_broker_core::RequestId;
use annotation_broker_core::ResponseEnvelope;
use annotation_broker_core::Transport;
use annotation_broker_core::TransportError;

// ============================================================================
// SECTION: Queued Transport
// ============================================================================

/// Parked call awaiting resolution.
type ParkedCall = (OutgoingRequest, Completion);

/// Transport holding calls until they are resolved by id.
#[derive(Debug, Default)]
pub struct QueuedTransport {
    /// Parked calls keyed by request id.
    calls: Mutex<BTreeMap<RequestId, ParkedCall>>,
}

impl QueuedTransport {
    /// Creates an empty transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the ids of parked calls in ascending order.
    #[must_use]
    pub fn pending_ids(&self) -> Vec<RequestId> {
        self.lock().keys().copied().collect()
    }

    /// Returns a copy of the parked request for `id`.
    #[must_use]
    pub fn request(&self, id: RequestId) -> Option<OutgoingRequest> {
        self.lock().get(&id).map(|(request, _)| request.clone())
    }

    /// Resolves a parked call with an envelope; false when `id` is not parked.
    pub fn resolve(&self, id: RequestId, envelope: ResponseEnvelope) -> bool {
        self.take(id).is_some_and(|completion| {
            completion.succeed(envelope);
            true
        })
    }

    /// Resolves a parked call with a failure; false when `id` is not parked.
    pub fn fail(&self, id: RequestId, error: TransportError) -> bool {
        self.take(id).is_some_and(|completion| {
            completion.fail(error);
            true
        })
    }

    /// Returns the number of parked calls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true when no call is parked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Removes a parked call and returns its completion.
    fn take(&self, id: RequestId) -> Option<Completion> {
        self.lock().remove(&id).map(|(_, completion)| completion)
    }

    /// Locks the call table, recovering from poisoning.
    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<RequestId, ParkedCall>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for QueuedTransport {
    fn send(&self, request: OutgoingRequest, completion: Completion) {
        self.lock().insert(request.request_id, (request, completion));
    }
}
