// crates/annotation-broker/src/transport/http.rs
// ============================================================================
// Module: Annotation Broker HTTP Transport
// Description: HTTP-backed transport for the annotation server endpoint.
// Purpose: POST form-encoded payloads and decode JSON response envelopes.
// Dependencies: annotation-broker-core, reqwest, tracing
// ============================================================================

//! ## Overview
//! `HttpTransport` sends each request on its own worker thread with a
//! blocking client, so [`Transport::send`] never blocks the broker. Redirects
//! are not followed. Non-success status codes, oversized bodies, and
//! undecodable bodies resolve the completion as a failure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::thread;
use std::time::Duration;

use annotation_broker_core::Completion;
use annotation_broker_core::OutgoingRequest;
use annotation_broker_core::ResponseEnvelope;
use annotation_broker_core::Transport;
use annotation_broker_core::TransportError;
use annotation_broker_core::TransportOutcome;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use tracing::debug;
use tracing::warn;

use crate::encoding::FORM_CONTENT_TYPE;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum size of a response body (bytes).
pub const MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// SECTION: HTTP Transport
// ============================================================================

/// HTTP-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// HTTP client used for requests.
    client: Client,
}

impl HttpTransport {
    /// Builds an HTTP transport with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the HTTP client cannot be constructed.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Builds an HTTP transport with a request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the HTTP client cannot be constructed.
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(timeout)
            .build()
            .map_err(|err| TransportError::Request(err.to_string()))?;
        Ok(Self {
            client,
        })
    }

    /// Creates an HTTP transport with a preconfigured client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self {
            client,
        }
    }

    /// Performs one request and decodes the envelope.
    fn execute(client: &Client, request: &OutgoingRequest) -> TransportOutcome {
        let response = client
            .post(&request.url)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(request.body.clone())
            .send()
            .map_err(|err| TransportError::Request(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        if let Some(length) = response.content_length()
            && length > MAX_RESPONSE_BYTES as u64
        {
            return Err(TransportError::Request(format!(
                "response exceeds size limit: {length} bytes"
            )));
        }
        let mut limited = response.take((MAX_RESPONSE_BYTES + 1) as u64);
        let mut bytes = Vec::new();
        limited.read_to_end(&mut bytes).map_err(|err| TransportError::Request(err.to_string()))?;
        if bytes.len() > MAX_RESPONSE_BYTES {
            return Err(TransportError::Request("response exceeds size limit".to_string()));
        }
        ResponseEnvelope::from_slice(&bytes).map_err(|err| TransportError::Decode(err.to_string()))
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: OutgoingRequest, completion: Completion) {
        let client = self.client.clone();
        debug!(request_id = request.request_id.get(), url = %request.url, "posting request");
        // A failed spawn drops the completion, which resolves as abandoned.
        let spawned = thread::Builder::new()
            .name(format!("annotation-broker-http-{}", request.request_id))
            .spawn(move || completion.complete(Self::execute(&client, &request)));
        if let Err(err) = spawned {
            warn!(error = %err, "failed to spawn transport worker");
        }
    }
}
