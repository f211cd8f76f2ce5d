// crates/annotation-broker/src/bus.rs
// ============================================================================
// Module: Annotation Broker Event Bus
// Description: Reference publish/subscribe dispatcher with a deferred task queue.
// Purpose: Deliver bus events to subscribers and run deferred callbacks in order.
// Dependencies: annotation-broker-core, std
// ============================================================================

//! ## Overview
//! [`EventBus`] is an in-process [`Dispatcher`]. Events are delivered
//! synchronously to the handlers subscribed to their [`EventKind`], in
//! subscription order. Deferred tasks are queued FIFO and only run when the
//! host calls [`EventBus::run_deferred`], which makes callback timing explicit
//! and deterministic.
//! Invariants:
//! - Handlers run outside the internal locks, so they may post or defer.
//! - Deferred tasks never run inside [`Dispatcher::defer`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use annotation_broker_core::BusEvent;
use annotation_broker_core::DeferredTask;
use annotation_broker_core::Dispatcher;
use annotation_broker_core::EventKind;

// ============================================================================
// SECTION: Event Bus
// ============================================================================

/// Event handler signature used by the bus.
type EventHandler = dyn Fn(&BusEvent) + Send + Sync;

/// In-process event bus and deferred task queue.
#[derive(Default)]
pub struct EventBus {
    /// Subscribed handlers keyed by event kind.
    handlers: Mutex<BTreeMap<EventKind, Vec<Arc<EventHandler>>>>,
    /// Deferred tasks awaiting execution.
    deferred: Mutex<VecDeque<DeferredTask>>,
}

impl EventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes a handler to an event kind.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> &Self
    where
        F: Fn(&BusEvent) + Send + Sync + 'static,
    {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(kind)
            .or_default()
            .push(Arc::new(handler));
        self
    }

    /// Runs deferred tasks until the queue is empty and returns how many ran.
    ///
    /// Tasks deferred while draining run in the same call, after those
    /// already queued.
    pub fn run_deferred(&self) -> usize {
        let mut ran = 0;
        while let Some(task) = self.pop_deferred() {
            task();
            ran += 1;
        }
        ran
    }

    /// Returns the number of deferred tasks waiting to run.
    #[must_use]
    pub fn deferred_len(&self) -> usize {
        self.deferred.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Pops the oldest deferred task.
    fn pop_deferred(&self) -> Option<DeferredTask> {
        self.deferred.lock().unwrap_or_else(PoisonError::into_inner).pop_front()
    }

    /// Returns a snapshot of the handlers for an event kind.
    fn handlers_for(&self, kind: EventKind) -> Vec<Arc<EventHandler>> {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }
}

impl Dispatcher for EventBus {
    fn post(&self, event: BusEvent) {
        for handler in self.handlers_for(event.kind()) {
            handler(&event);
        }
    }

    fn defer(&self, task: DeferredTask) {
        self.deferred.lock().unwrap_or_else(PoisonError::into_inner).push_back(task);
    }
}
