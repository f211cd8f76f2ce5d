// crates/annotation-broker/src/pending.rs
// ============================================================================
// Module: Annotation Broker Pending Table
// Description: Relevance tracking for submitted requests.
// Purpose: Decide which resolutions are still wanted.
// Dependencies: annotation-broker-core
// ============================================================================

//! ## Overview
//! [`PendingTable`] maps request identifiers to their keep flag. Presence
//! means a response is still wanted; absence means the request is obsolete
//! and its eventual response is discarded. The table is independent of the
//! in-flight counter: removing an entry never cancels the transport call.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use annotation_broker_core::RequestId;

// ============================================================================
// SECTION: Pending Table
// ============================================================================

/// Relevance table for submitted requests.
///
/// # Invariants
/// - Entries are only created by [`PendingTable::insert`] at submission time.
/// - Keep-flagged entries survive [`PendingTable::invalidate`] with `all = false`.
#[derive(Debug, Default, Clone)]
pub struct PendingTable {
    /// Keep flag per relevant request.
    entries: BTreeMap<RequestId, bool>,
}

impl PendingTable {
    /// Creates an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Registers a request as relevant.
    pub fn insert(&mut self, id: RequestId, keep: bool) {
        self.entries.insert(id, keep);
    }

    /// Returns true when the request is still relevant.
    #[must_use]
    pub fn contains(&self, id: RequestId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Returns the keep flag of a relevant request.
    #[must_use]
    pub fn keep_flag(&self, id: RequestId) -> Option<bool> {
        self.entries.get(&id).copied()
    }

    /// Marks a single request obsolete. Returns true when it was relevant.
    pub fn remove(&mut self, id: RequestId) -> bool {
        self.entries.remove(&id).is_some()
    }

    /// Marks every request obsolete, keep-flagged ones included.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Marks requests obsolete in bulk and returns how many were removed.
    ///
    /// With `all` every entry goes; otherwise only entries without the keep flag.
    pub fn invalidate(&mut self, all: bool) -> usize {
        let before = self.entries.len();
        if all {
            self.entries.clear();
        } else {
            self.entries.retain(|_, keep| *keep);
        }
        before - self.entries.len()
    }

    /// Returns the number of relevant requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no request is relevant.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates relevant request identifiers in submission order.
    pub fn ids(&self) -> impl Iterator<Item = RequestId> + '_ {
        self.entries.keys().copied()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
