// crates/annotation-broker-core/src/interfaces/mod.rs
// ============================================================================
// Module: Annotation Broker Interfaces
// Description: Host capabilities consumed by the broker.
// Purpose: Define the event bus, transport, waiter, and reload contracts.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! The broker owns request correlation and nothing else. Everything it needs
//! from the host environment is expressed here: a [`Dispatcher`] that
//! publishes [`BusEvent`] values and defers callbacks, a [`Transport`] that
//! performs one POST per request and resolves a [`Completion`], a [`Waiter`]
//! UI that can be closed, and a [`ReloadPolicy`] consulted on protocol
//! version mismatches.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use thiserror::Error;

use crate::core::envelope::ResponseEnvelope;
use crate::core::identifiers::ActionName;
use crate::core::identifiers::RequestId;
use crate::core::message::Message;

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// Events the broker publishes on the UI bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    /// A request went out; show activity.
    Spin,
    /// A request finished; activity may stop.
    Unspin,
    /// Messages to display, in order.
    Messages(Vec<Message>),
    /// A critical server condition halted the broker.
    ScreamingHalt,
}

impl BusEvent {
    /// Returns the subscription kind for the event.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Spin => EventKind::Spin,
            Self::Unspin => EventKind::Unspin,
            Self::Messages(_) => EventKind::Messages,
            Self::ScreamingHalt => EventKind::ScreamingHalt,
        }
    }
}

/// Subscription key for [`BusEvent`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    /// [`BusEvent::Spin`].
    Spin,
    /// [`BusEvent::Unspin`].
    Unspin,
    /// [`BusEvent::Messages`].
    Messages,
    /// [`BusEvent::ScreamingHalt`].
    ScreamingHalt,
}

impl EventKind {
    /// Returns the bus event name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spin => "spin",
            Self::Unspin => "unspin",
            Self::Messages => "messages",
            Self::ScreamingHalt => "screamingHalt",
        }
    }
}

/// Work scheduled for later execution by a [`Dispatcher`].
pub type DeferredTask = Box<dyn FnOnce() + Send>;

/// Publish/subscribe bus with a deferred-execution primitive.
pub trait Dispatcher: Send + Sync {
    /// Publishes an event to its subscribers.
    fn post(&self, event: BusEvent);

    /// Schedules a task to run after the current unit of work.
    ///
    /// Implementations must never run the task inline.
    fn defer(&self, task: DeferredTask);
}

// ============================================================================
// SECTION: Transport
// ============================================================================

/// Transport failures. None of these reach the UI bus.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Request could not be sent or the connection failed.
    #[error("transport request failed: {0}")]
    Request(String),
    /// Server answered with a non-success HTTP status.
    #[error("server returned status {0}")]
    Status(u16),
    /// Response body could not be decoded.
    #[error("response decode failed: {0}")]
    Decode(String),
    /// Completion was dropped without being resolved.
    #[error("request abandoned by transport")]
    Abandoned,
}

/// Result delivered to a [`Completion`].
pub type TransportOutcome = Result<ResponseEnvelope, TransportError>;

/// Serialized request handed to a [`Transport`].
///
/// # Invariants
/// - `body` is the form-encoded payload including `action` and `protocol`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingRequest {
    /// Correlation identifier of the request.
    pub request_id: RequestId,
    /// Action named by the payload.
    pub action: ActionName,
    /// Endpoint URL.
    pub url: String,
    /// Serialized payload.
    pub body: String,
}

/// Resolver signature wrapped by [`Completion`].
type Resolver = Box<dyn FnOnce(TransportOutcome) + Send>;

/// One-shot resolution handle for a single request.
///
/// # Invariants
/// - The wrapped resolver runs exactly once: on [`Completion::succeed`],
///   [`Completion::fail`], or, failing both, on drop with
///   [`TransportError::Abandoned`].
pub struct Completion {
    /// Resolver, taken on first resolution.
    resolver: Option<Resolver>,
}

impl Completion {
    /// Wraps a resolver function.
    pub fn new<F>(resolver: F) -> Self
    where
        F: FnOnce(TransportOutcome) + Send + 'static,
    {
        Self {
            resolver: Some(Box::new(resolver)),
        }
    }

    /// Resolves the request with a decoded envelope.
    pub fn succeed(mut self, envelope: ResponseEnvelope) {
        self.resolve(Ok(envelope));
    }

    /// Resolves the request as failed.
    pub fn fail(mut self, error: TransportError) {
        self.resolve(Err(error));
    }

    /// Resolves the request with a precomputed outcome.
    pub fn complete(mut self, outcome: TransportOutcome) {
        self.resolve(outcome);
    }

    /// Runs the resolver if it has not run yet.
    fn resolve(&mut self, outcome: TransportOutcome) {
        if let Some(resolver) = self.resolver.take() {
            resolver(outcome);
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.resolve(Err(TransportError::Abandoned));
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion").field("resolved", &self.resolver.is_none()).finish()
    }
}

/// Asynchronous request transport.
pub trait Transport: Send + Sync {
    /// Sends the request without blocking.
    ///
    /// The transport must eventually resolve `completion` exactly once; it may
    /// do so from any thread and before `send` returns.
    fn send(&self, request: OutgoingRequest, completion: Completion);
}

// ============================================================================
// SECTION: UI Collaborators
// ============================================================================

/// Modal "please wait" UI shown while the server works.
pub trait Waiter: Send + Sync {
    /// Closes the waiter.
    fn close(&self);
}

/// User decision on a reload prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadDecision {
    /// Reload the client.
    Accept,
    /// Keep the stale client running.
    Decline,
}

/// Decision point consulted when the server speaks a newer protocol.
pub trait ReloadPolicy: Send + Sync {
    /// Asks whether the client should reload. May block on the user.
    fn confirm_reload(&self, prompt: &str) -> ReloadDecision;

    /// Performs a full client reload.
    fn reload(&self);
}
