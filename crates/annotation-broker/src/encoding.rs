// crates/annotation-broker/src/encoding.rs
// ============================================================================
// Module: Annotation Broker Payload Encoding
// Description: Form encoding for outgoing request payloads.
// Purpose: Serialize payloads into the body handed to transports.
// Dependencies: annotation-broker-core, serde_json, url
// ============================================================================

//! ## Overview
//! Payloads travel as `application/x-www-form-urlencoded` bodies. `action`
//! and `protocol` are always written first; remaining fields follow in key
//! order. Strings are written verbatim, `null` as an empty value, and every
//! other JSON value as its compact JSON text.

// ============================================================================
// SECTION: Imports
// ============================================================================

use annotation_broker_core::RequestPayload;
use annotation_broker_core::core::payload::ACTION_KEY;
use annotation_broker_core::core::payload::PROTOCOL_KEY;
use serde_json::Value;
use url::form_urlencoded::Serializer;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Content type of encoded payload bodies.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

// ============================================================================
// SECTION: Encoding
// ============================================================================

/// Encodes a payload as a form body.
///
/// The protocol field is only written when the payload carries one; the
/// broker fills it before encoding.
#[must_use]
pub fn encode_form(payload: &RequestPayload) -> String {
    let mut serializer = Serializer::new(String::new());
    serializer.append_pair(ACTION_KEY, payload.action.as_str());
    if let Some(protocol) = payload.protocol() {
        serializer.append_pair(PROTOCOL_KEY, &protocol.to_string());
    }
    for (key, value) in payload.fields() {
        serializer.append_pair(key, &form_value(value));
    }
    serializer.finish()
}

/// Renders a JSON value as a form value.
fn form_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
