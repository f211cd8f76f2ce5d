// crates/annotation-broker-core/src/core/message.rs
// ============================================================================
// Module: Annotation Broker Messages
// Description: Display messages exchanged with the annotation server.
// Purpose: Model the `[text, severity, durationMs]` message triple.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Messages are user-facing notices attached to server responses or raised by
//! the broker itself. On the wire a message is a JSON array
//! `[text, severity, durationMs]`; the duration may be omitted, in which case
//! the UI chooses its own display time. Decoding is lenient: a message the
//! broker cannot interpret never invalidates the response carrying it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde::de;
use serde::ser::SerializeTuple;
use serde_json::Number;
use serde_json::Value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Duration value telling the UI to keep a message until dismissed.
pub const STICKY_DURATION_MS: i64 = -1;

// ============================================================================
// SECTION: Message Types
// ============================================================================

/// Message severity understood by the UI bus.
///
/// Labels outside the known set are kept verbatim in [`Severity::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Neutral annotation comment.
    Comment,
    /// Informational notice.
    Info,
    /// Recoverable problem.
    Warning,
    /// Failure requiring attention.
    Error,
    /// Label the broker does not interpret.
    Other(String),
}

impl Severity {
    /// Parses a wire label, keeping unknown labels.
    #[must_use]
    pub fn parse(label: &str) -> Self {
        match label {
            "comment" => Self::Comment,
            "info" => Self::Info,
            "warning" => Self::Warning,
            "error" => Self::Error,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the wire label for the severity.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Comment => "comment",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Other(label) => label,
        }
    }
}

/// Display message published on the UI bus.
///
/// # Invariants
/// - `duration_ms` of [`STICKY_DURATION_MS`] means the message stays until dismissed.
/// - `duration_ms` keeps the server's number as sent, integral or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Human-readable text.
    pub text: String,
    /// Message severity.
    pub severity: Severity,
    /// Display duration in milliseconds, when specified.
    pub duration_ms: Option<Number>,
}

impl Message {
    /// Creates a message with an explicit display duration.
    #[must_use]
    pub fn new(text: impl Into<String>, severity: Severity, duration_ms: i64) -> Self {
        Self {
            text: text.into(),
            severity,
            duration_ms: Some(Number::from(duration_ms)),
        }
    }

    /// Creates an error message that stays until dismissed.
    #[must_use]
    pub fn sticky_error(text: impl Into<String>) -> Self {
        Self::new(text, Severity::Error, STICKY_DURATION_MS)
    }

    /// Returns true when the message stays until dismissed.
    #[must_use]
    pub fn is_sticky(&self) -> bool {
        self.duration_ms.as_ref().and_then(Number::as_i64) == Some(STICKY_DURATION_MS)
    }
}

// ============================================================================
// SECTION: Serde
// ============================================================================

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.duration_ms.is_some() { 3 } else { 2 };
        let mut tuple = serializer.serialize_tuple(len)?;
        tuple.serialize_element(&self.text)?;
        tuple.serialize_element(self.severity.as_str())?;
        if let Some(duration) = &self.duration_ms {
            tuple.serialize_element(duration)?;
        }
        tuple.end()
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Self::parse(&label))
    }
}

impl<'de> Deserialize<'de> for Message {
    /// Accepts `[text, severity]` and `[text, severity, duration]`.
    ///
    /// Non-string severities are kept as their JSON text and a duration that
    /// is not a number is treated as unspecified.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<Value>::deserialize(deserializer)?;
        let mut items = items.into_iter();
        let text = match items.next() {
            Some(Value::String(text)) => text,
            Some(other) => other.to_string(),
            None => return Err(de::Error::invalid_length(0, &"a message triple")),
        };
        let severity = match items.next() {
            Some(Value::String(label)) => Severity::parse(&label),
            Some(other) => Severity::Other(other.to_string()),
            None => return Err(de::Error::invalid_length(1, &"a message triple")),
        };
        let duration_ms = match items.next() {
            Some(Value::Number(duration)) => Some(duration),
            _ => None,
        };
        Ok(Self {
            text,
            severity,
            duration_ms,
        })
    }
}

/// Decodes a `messages` field without failing the surrounding envelope.
///
/// `null` and non-array values yield no messages; entries that are not
/// message arrays are skipped.
///
/// # Errors
///
/// Returns the deserializer's error when the field is not well-formed JSON.
pub fn deserialize_messages<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<Message>, D::Error> {
    let Value::Array(entries) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(entries.into_iter().filter_map(|entry| serde_json::from_value(entry).ok()).collect())
}
