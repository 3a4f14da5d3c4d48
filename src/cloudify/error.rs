//! Error types for the Cloudify REST client.

use thiserror::Error;

/// Errors raised while talking to the Cloudify manager.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum CloudifyError {
    /// Raised when the client settings are incomplete.
    #[error("invalid client settings: {0}")]
    Settings(String),
    /// Raised when the request cannot be sent or the response cannot be read.
    #[error("request to {url} failed: {message}")]
    Transport {
        /// Endpoint that was called.
        url: String,
        /// Message returned by the HTTP stack.
        message: String,
    },
    /// Raised when the manager answers with a non-success status, including
    /// authentication failures.
    #[error("{url} returned HTTP {status}: {body}")]
    Status {
        /// Endpoint that was called.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Response body, lossily decoded.
        body: String,
    },
    /// Raised when a success response is not the expected JSON.
    #[error("unexpected response from {url}: {message}")]
    Decode {
        /// Endpoint that was called.
        url: String,
        /// Decoder error message.
        message: String,
    },
}
