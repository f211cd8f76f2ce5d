// crates/annotation-broker/src/command.rs
// ============================================================================
// Module: Annotation Broker Commands
// Description: Command envelope for hosts that drive the broker by message.
// Purpose: Route submit, reload-safety, and obsolescence requests to the broker.
// Dependencies: annotation-broker-core
// ============================================================================

//! ## Overview
//! Hosts that talk to the broker over a bus rather than by method call send a
//! [`BrokerCommand`] and receive a [`CommandReply`]. Each command maps to one
//! broker operation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use annotation_broker_core::RequestId;
use annotation_broker_core::RequestPayload;

use crate::broker::Broker;
use crate::broker::ResponseCallback;
use crate::options::RequestOptions;

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Command accepted by [`Broker::handle_command`].
pub enum BrokerCommand {
    /// Submit a request.
    Submit {
        /// Request payload.
        payload: RequestPayload,
        /// Callback for the delivered envelope.
        callback: Option<ResponseCallback>,
        /// Keep flag and merge fields.
        options: RequestOptions,
    },
    /// Ask whether a client reload would lose in-flight work.
    IsReloadSafe,
    /// Mark pending requests obsolete.
    Invalidate {
        /// Include keep-flagged requests.
        all: bool,
    },
}

impl fmt::Debug for BrokerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Submit {
                payload,
                callback,
                options,
            } => f
                .debug_struct("Submit")
                .field("action", &payload.action.as_str())
                .field("has_callback", &callback.is_some())
                .field("keep", &options.is_kept())
                .finish(),
            Self::IsReloadSafe => f.write_str("IsReloadSafe"),
            Self::Invalidate {
                all,
            } => f.debug_struct("Invalidate").field("all", all).finish(),
        }
    }
}

/// Reply returned for a [`BrokerCommand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandReply {
    /// Identifier assigned to a submitted request.
    Submitted(RequestId),
    /// Whether no request is in flight.
    ReloadSafe(bool),
    /// Number of requests made obsolete.
    Invalidated(usize),
}

// ============================================================================
// SECTION: Routing
// ============================================================================

impl Broker {
    /// Routes a command to the matching broker operation.
    pub fn handle_command(&mut self, command: BrokerCommand) -> CommandReply {
        match command {
            BrokerCommand::Submit {
                payload,
                callback,
                options,
            } => CommandReply::Submitted(self.submit(payload, callback, options)),
            BrokerCommand::IsReloadSafe => CommandReply::ReloadSafe(self.is_reload_safe()),
            BrokerCommand::Invalidate {
                all,
            } => CommandReply::Invalidated(self.invalidate(all)),
        }
    }
}
