// crates/annotation-broker/src/broker.rs
// ============================================================================
// Module: Annotation Broker
// Description: Correlated request broker between the UI bus and the annotation server.
// Purpose: Submit requests, track relevance, and route resolutions.
// Dependencies: annotation-broker-core, serde_json, thiserror, tokio, tracing, url
// ============================================================================

//! ## Overview
//! [`Broker`] assigns each submitted request a [`RequestId`], hands the
//! encoded payload to a [`Transport`], and later routes the resolution: to
//! the caller's callback (deferred through the [`Dispatcher`]), to the waiter
//! UI, or into a broker-wide halt. Resolutions travel back over an internal
//! channel and are applied by [`Broker::pump`] or [`Broker::next_resolution`],
//! so the broker state is only ever touched through `&mut self`.
//! Invariants:
//! - The in-flight counter moves once on submit and once on resolution.
//! - Obsolescence only edits the [`PendingTable`]; it never cancels a call.
//! - A callback runs at most once and never inline.
//! - After a critical resolution no other pending callback is delivered.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use annotation_broker_core::ActionName;
use annotation_broker_core::BusEvent;
use annotation_broker_core::Completion;
use annotation_broker_core::CriticalKind;
use annotation_broker_core::Dispatcher;
use annotation_broker_core::Message;
use annotation_broker_core::OutgoingRequest;
use annotation_broker_core::ProtocolVersion;
use annotation_broker_core::ReloadDecision;
use annotation_broker_core::ReloadPolicy;
use annotation_broker_core::RequestId;
use annotation_broker_core::RequestPayload;
use annotation_broker_core::ResponseEnvelope;
use annotation_broker_core::ServerException;
use annotation_broker_core::Transport;
use annotation_broker_core::TransportError;
use annotation_broker_core::TransportOutcome;
use annotation_broker_core::Waiter;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;
use url::Url;

use crate::collaborators::NoopWaiter;
use crate::collaborators::StaticReloadPolicy;
use crate::encoding::encode_form;
use crate::options::RequestOptions;
use crate::options::merge_into;
use crate::pending::PendingTable;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Prompt shown when the server speaks a different protocol version.
pub const RELOAD_PROMPT: &str = "The server is running a different version than your client, \
                                 possibly due to a server upgrade. Would you like to reload the \
                                 current page to update your client to the latest version?";

/// Message published when the user declines the reload prompt.
pub const VERSION_MISMATCH_FATAL: &str =
    "Fatal Error: Protocol version mismatch, please contact the administrator";

// ============================================================================
// SECTION: Broker Errors
// ============================================================================

/// Errors returned while building a broker.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// No dispatcher was configured.
    #[error("broker dispatcher is not configured")]
    MissingDispatcher,
    /// No transport was configured.
    #[error("broker transport is not configured")]
    MissingTransport,
    /// No endpoint URL was configured.
    #[error("broker endpoint is not configured")]
    MissingEndpoint,
    /// Endpoint URL failed to parse.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

// ============================================================================
// SECTION: Request Outcomes
// ============================================================================

/// Callback receiving a delivered response envelope.
pub type ResponseCallback = Box<dyn FnOnce(ResponseEnvelope) + Send>;

/// Terminal state reached by a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Response accepted; the callback, if any, was scheduled.
    Delivered,
    /// Request was obsolete when its response arrived.
    DiscardedObsolete,
    /// Generic server exception; callback suppressed, waiter closed.
    SuppressedException,
    /// Critical server exception; the whole broker halted.
    EscalatedCritical(CriticalKind),
    /// Transport failed; nothing surfaced on the bus.
    TransportFailed,
}

impl RequestState {
    /// Returns a stable label for logging.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::DiscardedObsolete => "discarded_obsolete",
            Self::SuppressedException => "suppressed_exception",
            Self::EscalatedCritical(_) => "escalated_critical",
            Self::TransportFailed => "transport_failed",
        }
    }
}

/// Request identifier paired with its terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRequest {
    /// Request identifier.
    pub id: RequestId,
    /// Terminal state reached.
    pub state: RequestState,
}

/// Transport resolution routed back to the broker.
struct Resolution {
    /// Request identifier.
    id: RequestId,
    /// Transport outcome.
    outcome: TransportOutcome,
}

/// Caller context retained until a request resolves.
struct InFlight {
    /// Action named by the submitted payload.
    action: ActionName,
    /// Callback to schedule on delivery.
    callback: Option<ResponseCallback>,
    /// Fields merged over the delivered envelope.
    merge: Map<String, Value>,
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Builder for a [`Broker`].
///
/// # Invariants
/// - `build` succeeds only with a dispatcher, a transport, and a valid endpoint.
/// - Waiter and reload policy default to [`NoopWaiter`] and a declining [`StaticReloadPolicy`].
pub struct BrokerBuilder {
    /// Endpoint URL requests are posted to.
    endpoint: Option<String>,
    /// Protocol version filled into payloads lacking one.
    protocol: ProtocolVersion,
    /// Event bus and deferral primitive.
    dispatcher: Option<Arc<dyn Dispatcher>>,
    /// Request transport.
    transport: Option<Arc<dyn Transport>>,
    /// Waiter UI.
    waiter: Option<Arc<dyn Waiter>>,
    /// Reload decision policy.
    reload: Option<Arc<dyn ReloadPolicy>>,
}

impl Default for BrokerBuilder {
    fn default() -> Self {
        Self {
            endpoint: None,
            protocol: ProtocolVersion::DEFAULT,
            dispatcher: None,
            transport: None,
            waiter: None,
            reload: None,
        }
    }
}

impl BrokerBuilder {
    /// Sets the endpoint URL.
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the default protocol version.
    #[must_use]
    pub const fn protocol_version(mut self, version: ProtocolVersion) -> Self {
        self.protocol = version;
        self
    }

    /// Sets the dispatcher.
    #[must_use]
    pub fn dispatcher<D: Dispatcher + 'static>(mut self, dispatcher: Arc<D>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Sets the transport.
    #[must_use]
    pub fn transport<T: Transport + 'static>(mut self, transport: Arc<T>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the waiter UI.
    #[must_use]
    pub fn waiter<W: Waiter + 'static>(mut self, waiter: Arc<W>) -> Self {
        self.waiter = Some(waiter);
        self
    }

    /// Sets the reload policy.
    #[must_use]
    pub fn reload_policy<R: ReloadPolicy + 'static>(mut self, reload: Arc<R>) -> Self {
        self.reload = Some(reload);
        self
    }

    /// Builds the broker.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError`] when a required collaborator is missing or the
    /// endpoint is not an absolute URL.
    pub fn build(self) -> Result<Broker, BrokerError> {
        let dispatcher = self.dispatcher.ok_or(BrokerError::MissingDispatcher)?;
        let transport = self.transport.ok_or(BrokerError::MissingTransport)?;
        let endpoint = self.endpoint.ok_or(BrokerError::MissingEndpoint)?;
        let endpoint =
            Url::parse(&endpoint).map_err(|err| BrokerError::InvalidEndpoint(err.to_string()))?;
        let (resolutions_tx, resolutions_rx) = mpsc::unbounded_channel();
        Ok(Broker {
            endpoint,
            protocol: self.protocol,
            dispatcher,
            transport,
            waiter: self.waiter.unwrap_or_else(|| Arc::new(NoopWaiter)),
            reload: self.reload.unwrap_or_else(|| Arc::new(StaticReloadPolicy::decline())),
            next_id: 0,
            in_flight: 0,
            pending: PendingTable::new(),
            contexts: BTreeMap::new(),
            resolutions_tx,
            resolutions_rx,
        })
    }
}

// ============================================================================
// SECTION: Broker
// ============================================================================

/// Correlated request broker.
///
/// # Invariants
/// - `in_flight` equals submissions minus resolutions applied.
/// - Every key of `pending` is also a key of `contexts`.
pub struct Broker {
    /// Endpoint URL requests are posted to.
    endpoint: Url,
    /// Protocol version filled into payloads lacking one.
    protocol: ProtocolVersion,
    /// Event bus and deferral primitive.
    dispatcher: Arc<dyn Dispatcher>,
    /// Request transport.
    transport: Arc<dyn Transport>,
    /// Waiter UI.
    waiter: Arc<dyn Waiter>,
    /// Reload decision policy.
    reload: Arc<dyn ReloadPolicy>,
    /// Next request identifier to allocate.
    next_id: u64,
    /// Requests submitted but not yet resolved.
    in_flight: usize,
    /// Requests whose responses are still wanted.
    pending: PendingTable,
    /// Caller context of unresolved requests.
    contexts: BTreeMap<RequestId, InFlight>,
    /// Sender cloned into every completion.
    resolutions_tx: mpsc::UnboundedSender<Resolution>,
    /// Receiver of transport resolutions.
    resolutions_rx: mpsc::UnboundedReceiver<Resolution>,
}

impl Broker {
    /// Returns a builder for the broker.
    #[must_use]
    pub fn builder() -> BrokerBuilder {
        BrokerBuilder::default()
    }

    /// Submits a request and returns its identifier without waiting.
    ///
    /// Emits `spin`, registers the request as pending with the options' keep
    /// flag, fills in the protocol version, and hands the encoded payload to
    /// the transport.
    pub fn submit(
        &mut self,
        mut payload: RequestPayload,
        callback: Option<ResponseCallback>,
        options: RequestOptions,
    ) -> RequestId {
        self.dispatcher.post(BusEvent::Spin);
        self.in_flight += 1;
        let id = RequestId::new(self.next_id);
        self.next_id += 1;

        let (keep, merge) = options.into_parts();
        self.pending.insert(id, keep);
        let protocol = payload.ensure_protocol(self.protocol);
        self.contexts.insert(
            id,
            InFlight {
                action: payload.action.clone(),
                callback,
                merge,
            },
        );

        debug!(
            request_id = id.get(),
            action = %payload.action,
            protocol = protocol.get(),
            keep,
            "submitting request"
        );
        let request = OutgoingRequest {
            request_id: id,
            action: payload.action.clone(),
            url: self.endpoint.to_string(),
            body: encode_form(&payload),
        };
        let sender = self.resolutions_tx.clone();
        let completion = Completion::new(move |outcome| {
            let resolution = Resolution {
                id,
                outcome,
            };
            if sender.send(resolution).is_err() {
                debug!(request_id = id.get(), "broker dropped before resolution");
            }
        });
        self.transport.send(request, completion);
        id
    }

    /// Applies every resolution already received, in arrival order.
    pub fn pump(&mut self) -> Vec<ResolvedRequest> {
        let mut resolved = Vec::new();
        while let Ok(resolution) = self.resolutions_rx.try_recv() {
            resolved.push(self.apply(resolution));
        }
        resolved
    }

    /// Waits for the next resolution and applies it.
    ///
    /// Returns `None` immediately when nothing is in flight.
    pub async fn next_resolution(&mut self) -> Option<ResolvedRequest> {
        if self.in_flight == 0 {
            return None;
        }
        let resolution = self.resolutions_rx.recv().await?;
        Some(self.apply(resolution))
    }

    /// Returns true when no request is in flight.
    #[must_use]
    pub const fn is_reload_safe(&self) -> bool {
        self.in_flight == 0
    }

    /// Returns the number of submitted requests not yet resolved.
    #[must_use]
    pub const fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Returns true when the request's response is still wanted.
    #[must_use]
    pub fn is_pending(&self, id: RequestId) -> bool {
        self.pending.contains(id)
    }

    /// Returns the number of requests whose responses are still wanted.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Marks pending requests obsolete and returns how many were dropped.
    ///
    /// With `all` every request goes, keep-flagged ones included; otherwise
    /// keep-flagged requests stay pending. The in-flight count is unchanged.
    pub fn invalidate(&mut self, all: bool) -> usize {
        let removed = self.pending.invalidate(all);
        debug!(all, removed, "requests made obsolete");
        removed
    }

    /// Returns the configured endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Returns the default protocol version.
    #[must_use]
    pub const fn protocol_version(&self) -> ProtocolVersion {
        self.protocol
    }

    // ------------------------------------------------------------------------
    // Resolution handling
    // ------------------------------------------------------------------------

    /// Applies one transport resolution.
    fn apply(&mut self, resolution: Resolution) -> ResolvedRequest {
        let Resolution {
            id,
            outcome,
        } = resolution;
        self.in_flight = self.in_flight.saturating_sub(1);
        let state = match (self.contexts.remove(&id), outcome) {
            (Some(context), Ok(envelope)) => self.on_success(id, context, envelope),
            (_, Err(err)) => self.on_failure(id, &err),
            (None, Ok(_)) => {
                // Completions are only minted by submit; keep the bus balanced anyway.
                warn!(request_id = id.get(), "resolution for unknown request");
                self.dispatcher.post(BusEvent::Unspin);
                RequestState::DiscardedObsolete
            }
        };
        debug!(request_id = id.get(), state = state.label(), "request resolved");
        ResolvedRequest {
            id,
            state,
        }
    }

    /// Routes a successful transport resolution.
    fn on_success(
        &mut self,
        id: RequestId,
        context: InFlight,
        mut envelope: ResponseEnvelope,
    ) -> RequestState {
        if envelope.exception.is_none() && !envelope.echoes(&context.action) {
            let returned = envelope.action.as_ref().map_or("<none>", ActionName::as_str);
            error!(
                request_id = id.get(),
                requested = %context.action,
                returned,
                "action returned the results of another action"
            );
            envelope.exception = ServerException::Suppressed;
            self.dispatcher.post(BusEvent::Messages(vec![protocol_error_message(
                &context.action,
                returned,
            )]));
        }

        if !self.pending.contains(id) {
            debug!(request_id = id.get(), "discarding response to obsolete request");
            self.dispatcher.post(BusEvent::Unspin);
            return RequestState::DiscardedObsolete;
        }

        self.dispatcher.post(BusEvent::Messages(envelope.messages.clone()));

        if let Some(kind) = envelope.exception.critical_kind() {
            self.escalate(id, kind);
            return RequestState::EscalatedCritical(kind);
        }

        self.pending.remove(id);
        let state = if envelope.exception == ServerException::Suppressed {
            self.waiter.close();
            RequestState::SuppressedException
        } else {
            if let Some(callback) = context.callback {
                merge_into(&mut envelope, context.merge);
                self.dispatcher.defer(Box::new(move || callback(envelope)));
            }
            RequestState::Delivered
        };
        self.dispatcher.post(BusEvent::Unspin);
        state
    }

    /// Routes a failed transport resolution.
    fn on_failure(&mut self, id: RequestId, err: &TransportError) -> RequestState {
        warn!(request_id = id.get(), error = %err, "request failed in transport");
        self.pending.remove(id);
        self.dispatcher.post(BusEvent::Unspin);
        self.waiter.close();
        RequestState::TransportFailed
    }

    /// Halts the broker on a critical server condition.
    fn escalate(&mut self, id: RequestId, kind: CriticalKind) {
        let dropped = self.pending.len();
        self.pending.clear();
        error!(
            request_id = id.get(),
            kind = kind.as_str(),
            dropped,
            "critical server exception; halting all pending requests"
        );
        self.dispatcher.post(BusEvent::ScreamingHalt);
        if kind != CriticalKind::ProtocolVersionMismatch {
            return;
        }
        match self.reload.confirm_reload(RELOAD_PROMPT) {
            ReloadDecision::Accept => {
                info!("reload accepted after protocol version mismatch");
                self.reload.reload();
            }
            ReloadDecision::Decline => {
                info!("reload declined after protocol version mismatch");
                self.dispatcher
                    .post(BusEvent::Messages(vec![Message::sticky_error(VERSION_MISMATCH_FATAL)]));
            }
        }
    }
}

impl fmt::Debug for Broker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broker")
            .field("endpoint", &self.endpoint.as_str())
            .field("protocol", &self.protocol.get())
            .field("next_id", &self.next_id)
            .field("in_flight", &self.in_flight)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds the message published when a response echoes the wrong action.
fn protocol_error_message(requested: &ActionName, returned: &str) -> Message {
    Message::sticky_error(format!(
        "Protocol error: Action {requested} returned the results of action {returned}, maybe \
         the server is unable to run, please run tools/troubleshooting.sh from your \
         installation to diagnose it"
    ))
}
