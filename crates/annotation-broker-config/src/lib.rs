// crates/annotation-broker-config/src/lib.rs
// ============================================================================
// Module: Annotation Broker Config Library
// Description: Canonical config model, validation, and example generation.
// Purpose: Single source of truth for annotation-broker.toml semantics.
// Dependencies: annotation-broker-core, serde, toml, url
// ============================================================================

//! ## Overview
//! `annotation-broker-config` defines the configuration model for hosts that
//! run the annotation broker: the server endpoint, the protocol version
//! stamped on requests, and logging. Loading is strict and fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
