// crates/annotation-broker/src/transport/mod.rs
// ============================================================================
// Module: Annotation Broker Transports
// Description: Reference transport implementations.
// Purpose: Carry encoded payloads to the annotation server and back.
// Dependencies: annotation-broker-core, reqwest, tracing
// ============================================================================

//! ## Overview
//! [`HttpTransport`] posts payloads to the server over HTTP on a worker
//! thread. [`QueuedTransport`] parks every call until the host resolves it,
//! for hosts that own their own I/O and for tests.

pub mod http;
pub mod queued;

pub use http::HttpTransport;
pub use http::MAX_RESPONSE_BYTES;
pub use queued::QueuedTransport;
