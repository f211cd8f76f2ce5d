// crates/annotation-broker-core/src/core/envelope.rs
// ============================================================================
// Module: Annotation Broker Response Envelope
// Description: Incoming response envelopes and server exception variants.
// Purpose: Decode server responses into typed envelopes.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Every server response is a JSON object echoing the request action, carrying
//! display messages, an optional exception marker, and action-specific fields.
//! The loosely typed `exception` field is decoded into [`ServerException`]:
//!
//! | wire value                  | variant                                   |
//! |-----------------------------|-------------------------------------------|
//! | absent, `null`              | [`ServerException::None`]                 |
//! | `true`                      | [`ServerException::Suppressed`]           |
//! | `"configurationError"`      | [`CriticalKind::ConfigurationError`]      |
//! | `"protocolVersionMismatch"` | [`CriticalKind::ProtocolVersionMismatch`] |
//! | any other value             | [`ServerException::Unrecognized`]         |
//!
//! Only `true` suppresses; `false`, `1`, and other values are present but
//! uninterpreted, so they skip the action echo check and reach the callback.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::identifiers::ActionName;
use crate::core::message::Message;
use crate::core::message::deserialize_messages;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while decoding wire data.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum WireError {
    /// Response body was not a valid envelope.
    #[error("invalid response envelope: {0}")]
    InvalidEnvelope(String),
}

// ============================================================================
// SECTION: Server Exceptions
// ============================================================================

/// Server conditions that halt the whole broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CriticalKind {
    /// Server installation is misconfigured.
    ConfigurationError,
    /// Client and server speak different protocol versions.
    ProtocolVersionMismatch,
}

impl CriticalKind {
    /// Returns the wire label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConfigurationError => "configurationError",
            Self::ProtocolVersionMismatch => "protocolVersionMismatch",
        }
    }

    /// Parses a wire label into a critical kind.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "configurationError" => Some(Self::ConfigurationError),
            "protocolVersionMismatch" => Some(Self::ProtocolVersionMismatch),
            _ => None,
        }
    }
}

/// Exception marker attached to a response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ServerException {
    /// No exception reported.
    #[default]
    None,
    /// Generic failure; the response must not reach its callback.
    Suppressed,
    /// Broker-wide halt condition.
    Critical(CriticalKind),
    /// Exception value the broker does not interpret; handed to the callback.
    Unrecognized(String),
}

impl ServerException {
    /// Returns true when no exception is reported.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Returns the critical kind, if any.
    #[must_use]
    pub const fn critical_kind(&self) -> Option<CriticalKind> {
        match self {
            Self::Critical(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Decodes the raw wire value of the `exception` field.
    #[must_use]
    pub fn from_wire(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::None,
            Some(Value::Bool(true)) => Self::Suppressed,
            Some(Value::String(label)) => CriticalKind::parse(label)
                .map_or_else(|| Self::Unrecognized(label.clone()), Self::Critical),
            Some(other) => Self::Unrecognized(other.to_string()),
        }
    }
}

impl Serialize for ServerException {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::None => serializer.serialize_none(),
            Self::Suppressed => serializer.serialize_bool(true),
            Self::Critical(kind) => serializer.serialize_str(kind.as_str()),
            Self::Unrecognized(label) => serializer.serialize_str(label),
        }
    }
}

impl<'de> Deserialize<'de> for ServerException {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(Self::from_wire(value.as_ref()))
    }
}

// ============================================================================
// SECTION: Response Envelope
// ============================================================================

/// Decoded server response.
///
/// # Invariants
/// - `fields` never contains the `action`, `exception`, or `messages` keys.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Echoed action name; missing on malformed responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionName>,
    /// Exception marker.
    #[serde(default, skip_serializing_if = "ServerException::is_none")]
    pub exception: ServerException,
    /// Messages to publish on the UI bus, in order.
    #[serde(default, deserialize_with = "deserialize_messages")]
    pub messages: Vec<Message>,
    /// Action-specific fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ResponseEnvelope {
    /// Creates an empty envelope echoing the provided action.
    #[must_use]
    pub fn for_action(action: impl Into<ActionName>) -> Self {
        Self {
            action: Some(action.into()),
            ..Self::default()
        }
    }

    /// Sets the exception marker, returning the updated envelope.
    #[must_use]
    pub fn with_exception(mut self, exception: ServerException) -> Self {
        self.exception = exception;
        self
    }

    /// Appends a message, returning the updated envelope.
    #[must_use]
    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Adds an action-specific field, returning the updated envelope.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Returns true when the envelope echoes the given action.
    #[must_use]
    pub fn echoes(&self, action: &ActionName) -> bool {
        self.action.as_ref() == Some(action)
    }

    /// Decodes an envelope from raw response bytes.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::InvalidEnvelope`] when the bytes are not a JSON envelope.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, WireError> {
        serde_json::from_slice(bytes).map_err(|err| WireError::InvalidEnvelope(err.to_string()))
    }

    /// Decodes an envelope from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::InvalidEnvelope`] when the value is not a JSON envelope.
    pub fn from_value(value: Value) -> Result<Self, WireError> {
        serde_json::from_value(value).map_err(|err| WireError::InvalidEnvelope(err.to_string()))
    }
}
