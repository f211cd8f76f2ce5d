// crates/annotation-broker/src/lib.rs
// ============================================================================
// Module: Annotation Broker Library
// Description: Correlated request broker with reference bus and transports.
// Purpose: Track request relevance and route annotation server responses.
// Dependencies: annotation-broker-core, reqwest, tokio, tracing, url
// ============================================================================

//! ## Overview
//! Annotation Broker sits between UI components and the remote annotation
//! server. It correlates each request with its response, drops responses to
//! requests made obsolete in the meantime, and escalates critical server
//! conditions into a broker-wide halt. Reference collaborators ([`EventBus`],
//! [`HttpTransport`], [`QueuedTransport`], [`NoopWaiter`],
//! [`StaticReloadPolicy`]) let headless hosts run it as-is.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod broker;
pub mod bus;
pub mod collaborators;
pub mod command;
pub mod encoding;
pub mod options;
pub mod pending;
pub mod transport;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use broker::Broker;
pub use broker::BrokerBuilder;
pub use broker::BrokerError;
pub use broker::RELOAD_PROMPT;
pub use broker::RequestState;
pub use broker::ResolvedRequest;
pub use broker::ResponseCallback;
pub use broker::VERSION_MISMATCH_FATAL;
pub use bus::EventBus;
pub use collaborators::NoopWaiter;
pub use collaborators::StaticReloadPolicy;
pub use command::BrokerCommand;
pub use command::CommandReply;
pub use encoding::FORM_CONTENT_TYPE;
pub use encoding::encode_form;
pub use options::RequestOptions;
pub use pending::PendingTable;
pub use transport::HttpTransport;
pub use transport::QueuedTransport;
