// crates/annotation-broker-core/src/core/payload.rs
// ============================================================================
// Module: Annotation Broker Request Payload
// Description: Outgoing request payloads sent to the annotation server.
// Purpose: Carry the required action, the protocol version, and action fields.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`RequestPayload`] always names an action. The protocol version is
//! optional until submission, where the broker fills in its configured
//! default. Remaining fields are action-specific and opaque to the broker.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::core::identifiers::ActionName;
use crate::core::identifiers::ProtocolVersion;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Wire key holding the action name.
pub const ACTION_KEY: &str = "action";
/// Wire key holding the protocol version.
pub const PROTOCOL_KEY: &str = "protocol";

// ============================================================================
// SECTION: Request Payload
// ============================================================================

/// Outgoing request payload.
///
/// # Invariants
/// - `fields` never contains the reserved `action` or `protocol` keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPayload {
    /// Server action to invoke.
    pub action: ActionName,
    /// Protocol version, filled with the broker default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    protocol: Option<ProtocolVersion>,
    /// Action-specific fields.
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl RequestPayload {
    /// Creates a payload for the provided action.
    #[must_use]
    pub fn new(action: impl Into<ActionName>) -> Self {
        Self {
            action: action.into(),
            protocol: None,
            fields: Map::new(),
        }
    }

    /// Adds an action field, returning the updated payload.
    ///
    /// Reserved keys are ignored; use [`RequestPayload::with_protocol`] instead.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Pins the protocol version explicitly.
    #[must_use]
    pub const fn with_protocol(mut self, version: ProtocolVersion) -> Self {
        self.protocol = Some(version);
        self
    }

    /// Inserts an action field. Returns false when the key is reserved.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        let key = key.into();
        if key == ACTION_KEY || key == PROTOCOL_KEY {
            return false;
        }
        self.fields.insert(key, value.into());
        true
    }

    /// Returns an action field by key.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns all action fields.
    #[must_use]
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Returns the protocol version when one is set.
    #[must_use]
    pub const fn protocol(&self) -> Option<ProtocolVersion> {
        self.protocol
    }

    /// Sets the protocol version to `default` when absent and returns the effective version.
    pub fn ensure_protocol(&mut self, default: ProtocolVersion) -> ProtocolVersion {
        *self.protocol.get_or_insert(default)
    }
}
