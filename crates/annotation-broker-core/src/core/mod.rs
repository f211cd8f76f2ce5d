// crates/annotation-broker-core/src/core/mod.rs
// ============================================================================
// Module: Annotation Broker Core Types
// Description: Canonical identifiers and wire structures for broker traffic.
// Purpose: Provide stable, serializable types shared by broker and hosts.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Core types describe what travels between the broker and the annotation
//! server: request payloads, response envelopes, server exceptions, and the
//! display messages published on the UI bus.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod envelope;
pub mod identifiers;
pub mod message;
pub mod payload;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use envelope::CriticalKind;
pub use envelope::ResponseEnvelope;
pub use envelope::ServerException;
pub use envelope::WireError;
pub use identifiers::ActionName;
pub use identifiers::ProtocolVersion;
pub use identifiers::RequestId;
pub use message::Message;
pub use message::STICKY_DURATION_MS;
pub use message::Severity;
pub use payload::RequestPayload;
