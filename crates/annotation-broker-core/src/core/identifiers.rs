// crates/annotation-broker-core/src/core/identifiers.rs
// ============================================================================
// Module: Annotation Broker Identifiers
// Description: Opaque identifiers for broker requests and server actions.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers used by the broker. Request identifiers are 0-based and
//! allocated by a single broker instance; they are never reused within that
//! instance. Protocol versions are non-zero.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::num::NonZeroU32;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Correlation identifier assigned to a submitted request.
///
/// # Invariants
/// - Strictly increasing per broker instance, starting at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    /// Creates a request identifier from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw identifier value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Server action name carried by requests and echoed by responses.
///
/// # Invariants
/// - Opaque UTF-8 string; compared byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionName(String);

impl ActionName {
    /// Creates a new action name.
    #[must_use]
    pub fn new(action: impl Into<String>) -> Self {
        Self(action.into())
    }

    /// Returns the action name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ActionName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ActionName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Wire-protocol version negotiated with the annotation server.
///
/// # Invariants
/// - Always >= 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProtocolVersion(NonZeroU32);

impl ProtocolVersion {
    /// Protocol version spoken when none is configured.
    pub const DEFAULT: Self = Self(NonZeroU32::MIN);

    /// Creates a protocol version from a non-zero value.
    #[must_use]
    pub const fn new(version: NonZeroU32) -> Self {
        Self(version)
    }

    /// Creates a protocol version from a raw value (returns `None` if zero).
    #[must_use]
    pub fn from_raw(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    /// Returns the raw version value (always >= 1).
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.get().fmt(f)
    }
}
