// crates/annotation-broker-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for docs and tooling.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example for annotation broker configuration. The output is
//! deterministic and must load cleanly.

/// Returns a canonical example `annotation-broker.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[endpoint]
url = "http://127.0.0.1:8001/ajax.cgi"
timeout_ms = 30000

[protocol]
version = 1

[logging]
level = "info"
format = "text"
"#,
    )
}
