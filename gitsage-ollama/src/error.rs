//! Error type for the Ollama client and helpers mapping `reqwest` failures onto it.

use std::time::Duration;

/// Errors from talking to an Ollama server.
#[derive(Debug, thiserror::Error)]
pub enum OllamaError {
    // Retryable before the stream starts
    /// The server could not be reached (connection refused, DNS failure, ...).
    #[error("cannot reach ollama at {address}: {source}")]
    Unreachable {
        /// URL the request was sent to.
        address: String,
        /// Underlying transport error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// The request timed out.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    // Terminal
    /// The server answered with a non-success status.
    #[error("ollama request failed with status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },
    /// A line of the response stream was not a valid response object.
    #[error("failed to decode response line: {0}")]
    Decode(String),
    /// The stream ended or broke before the final unit arrived.
    #[error("stream interrupted: {0}")]
    StreamInterrupted(String),
    /// The caller cancelled the exchange.
    #[error("cancelled")]
    Cancelled,
}

impl OllamaError {
    /// Whether the initial request may be retried after this error.
    ///
    /// Only connection-class failures and 5xx statuses qualify. Nothing is
    /// retried once response lines have started arriving.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unreachable { .. } | Self::Timeout(_) => true,
            Self::Status { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }
}

/// Map an HTTP status and body to an [`OllamaError`].
pub(crate) fn map_http_status(status: reqwest::StatusCode, body: &str) -> OllamaError {
    OllamaError::Status {
        status: status.as_u16(),
        body: body.to_string(),
    }
}

/// Map a [`reqwest::Error`] raised while sending a request to `address`.
pub(crate) fn map_reqwest_error(err: reqwest::Error, address: &str, timeout: Duration) -> OllamaError {
    if err.is_timeout() {
        OllamaError::Timeout(timeout)
    } else {
        OllamaError::Unreachable {
            address: address.to_string(),
            source: Box::new(err),
        }
    }
}
