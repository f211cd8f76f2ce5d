// crates/annotation-broker/src/options.rs
// ============================================================================
// Module: Annotation Broker Request Options
// Description: Per-request submission options and response merge fields.
// Purpose: Carry the keep flag and caller data merged into delivered envelopes.
// Dependencies: annotation-broker-core, serde_json
// ============================================================================

//! ## Overview
//! [`RequestOptions`] holds the `keep` flag, which protects a request from
//! partial obsolescence, and a set of merge fields that are copied over the
//! response envelope just before the callback is scheduled. Merge fields win
//! on conflict. The `keep` flag is never merged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use annotation_broker_core::ActionName;
use annotation_broker_core::Message;
use annotation_broker_core::ResponseEnvelope;
use annotation_broker_core::ServerException;
use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Option key carrying the keep flag.
pub const KEEP_KEY: &str = "keep";

// ============================================================================
// SECTION: Request Options
// ============================================================================

/// Submission options for a single request.
///
/// # Invariants
/// - `merge` never contains [`KEEP_KEY`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Survives partial obsolescence when true.
    keep: bool,
    /// Fields merged over the response envelope before delivery.
    merge: Map<String, Value>,
}

impl RequestOptions {
    /// Creates options with no keep flag and no merge fields.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds options from a loose option map, stripping the `keep` entry.
    ///
    /// Only a JSON `true` sets the keep flag.
    #[must_use]
    pub fn from_map(mut map: Map<String, Value>) -> Self {
        let keep = matches!(map.remove(KEEP_KEY), Some(Value::Bool(true)));
        Self {
            keep,
            merge: map,
        }
    }

    /// Sets the keep flag.
    #[must_use]
    pub const fn keep(mut self, keep: bool) -> Self {
        self.keep = keep;
        self
    }

    /// Adds a merge field. A `keep` key sets the keep flag instead.
    #[must_use]
    pub fn merge_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        let value = value.into();
        if key == KEEP_KEY {
            self.keep = matches!(value, Value::Bool(true));
        } else {
            self.merge.insert(key, value);
        }
        self
    }

    /// Returns the keep flag.
    #[must_use]
    pub const fn is_kept(&self) -> bool {
        self.keep
    }

    /// Returns the merge fields.
    #[must_use]
    pub const fn merge_fields(&self) -> &Map<String, Value> {
        &self.merge
    }

    /// Splits the options into the keep flag and the merge fields.
    #[must_use]
    pub fn into_parts(self) -> (bool, Map<String, Value>) {
        (self.keep, self.merge)
    }
}

// ============================================================================
// SECTION: Merge
// ============================================================================

/// Copies merge fields over an envelope; merge values win.
///
/// `action`, `messages`, and `exception` overwrite the typed envelope fields
/// when the value has the matching wire shape and are ignored otherwise.
pub fn merge_into(envelope: &mut ResponseEnvelope, merge: Map<String, Value>) {
    for (key, value) in merge {
        match key.as_str() {
            "action" => {
                if let Value::String(action) = value {
                    envelope.action = Some(ActionName::new(action));
                }
            }
            "messages" => {
                if let Ok(messages) = serde_json::from_value::<Vec<Message>>(value) {
                    envelope.messages = messages;
                }
            }
            "exception" => envelope.exception = ServerException::from_wire(Some(&value)),
            _ => {
                envelope.fields.insert(key, value);
            }
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
