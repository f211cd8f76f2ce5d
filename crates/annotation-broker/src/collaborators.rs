// crates/annotation-broker/src/collaborators.rs
// ============================================================================
// Module: Annotation Broker Reference Collaborators
// Description: Inert waiter and fixed-answer reload policy implementations.
// Purpose: Provide defaults for hosts without a modal UI.
// Dependencies: annotation-broker-core, tracing
// ============================================================================

//! ## Overview
//! Headless hosts (CLIs, services, tests) have no waiter dialog and cannot
//! ask a user to reload. [`NoopWaiter`] ignores close requests and
//! [`StaticReloadPolicy`] answers every reload prompt the same way.

// ============================================================================
// SECTION: Imports
// ============================================================================

use annotation_broker_core::ReloadDecision;
use annotation_broker_core::ReloadPolicy;
use annotation_broker_core::Waiter;
use tracing::info;

// ============================================================================
// SECTION: Waiter
// ============================================================================

/// Waiter that has nothing to close.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopWaiter;

impl Waiter for NoopWaiter {
    fn close(&self) {}
}

// ============================================================================
// SECTION: Reload Policy
// ============================================================================

/// Reload policy returning a fixed decision.
///
/// # Invariants
/// - [`ReloadPolicy::reload`] only records the request; there is no client to reload.
#[derive(Debug, Clone, Copy)]
pub struct StaticReloadPolicy {
    /// Decision returned for every prompt.
    decision: ReloadDecision,
}

impl StaticReloadPolicy {
    /// Creates a policy that always returns `decision`.
    #[must_use]
    pub const fn new(decision: ReloadDecision) -> Self {
        Self {
            decision,
        }
    }

    /// Creates a policy that always declines.
    #[must_use]
    pub const fn decline() -> Self {
        Self::new(ReloadDecision::Decline)
    }
}

impl Default for StaticReloadPolicy {
    fn default() -> Self {
        Self::decline()
    }
}

impl ReloadPolicy for StaticReloadPolicy {
    fn confirm_reload(&self, prompt: &str) -> ReloadDecision {
        info!(prompt, accepted = self.decision == ReloadDecision::Accept, "reload prompt answered");
        self.decision
    }

    fn reload(&self) {
        info!("client reload requested");
    }
}
