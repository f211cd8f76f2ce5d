// crates/annotation-broker-core/src/lib.rs
// ============================================================================
// Module: Annotation Broker Core Library
// Description: Public API surface for the annotation broker core.
// Purpose: Expose wire types and collaborator interfaces.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Annotation broker core defines the wire contract spoken with the remote
//! annotation server and the narrow interfaces the broker consumes from its
//! host: an event [`Dispatcher`], a request [`Transport`], a [`Waiter`] UI, and
//! a [`ReloadPolicy`]. It carries no runtime state of its own.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use interfaces::BusEvent;
pub use interfaces::Completion;
pub use interfaces::DeferredTask;
pub use interfaces::Dispatcher;
pub use interfaces::EventKind;
pub use interfaces::OutgoingRequest;
pub use interfaces::ReloadDecision;
pub use interfaces::ReloadPolicy;
pub use interfaces::Transport;
pub use interfaces::TransportError;
pub use interfaces::TransportOutcome;
pub use interfaces::Waiter;
