//! Error taxonomy for the execution lifecycle.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::execution::{ExecutionId, ProtocolError};
use crate::request::RequestError;

/// Reason carried by a failed execution.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FailureReason {
    /// Error message reported by the orchestrator.
    Message(String),
    /// The orchestrator reported a failure without any message.
    Empty,
}

impl FailureReason {
    /// Classifies an optional orchestrator message. Only an absent or
    /// zero-length message is [`Self::Empty`]; any other text is kept as
    /// reported.
    #[must_use]
    pub fn from_message(message: Option<&str>) -> Self {
        match message {
            None | Some("") => Self::Empty,
            Some(text) => Self::Message(text.to_owned()),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message(text) => f.write_str(text),
            Self::Empty => f.write_str("execution failed without an error message"),
        }
    }
}

/// Broad category of an [`ExecutionError`], for callers that render a
/// distinct message per category.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// The operation request was rejected before any network call.
    InvalidRequest,
    /// The orchestrator could not be reached or refused the call.
    Transport,
    /// The orchestrator answered with an unexpected shape.
    Protocol,
    /// The wait deadline expired.
    Timeout,
    /// The wait was interrupted by shutdown.
    Cancelled,
    /// The execution ran and failed remotely.
    RemoteFailure,
}

/// Errors surfaced while submitting or awaiting an execution.
#[derive(Debug, Error)]
pub enum ExecutionError<E>
where
    E: std::error::Error + 'static,
{
    /// Raised when the operation request is malformed.
    #[error("invalid operation request: {0}")]
    InvalidRequest(#[from] RequestError),
    /// Raised when the orchestrator call itself fails.
    #[error("orchestrator request failed: {0}")]
    Transport(#[source] E),
    /// Raised when a response violates the expected contract.
    #[error("orchestrator protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    /// Raised when the execution reaches the `failed` state.
    #[error("{reason}")]
    RemoteFailed {
        /// Identifier of the failed execution.
        execution_id: ExecutionId,
        /// Failure reason reported by the orchestrator.
        reason: FailureReason,
    },
    /// Raised when the execution does not finish before the deadline.
    #[error("timeout after {waited:?} waiting for execution {execution_id}")]
    Timeout {
        /// Identifier of the execution being awaited.
        execution_id: ExecutionId,
        /// Time spent waiting.
        waited: Duration,
    },
    /// Raised when the wait is cancelled, for example on shutdown.
    #[error("wait for execution {execution_id} was cancelled")]
    Cancelled {
        /// Identifier of the execution being awaited.
        execution_id: ExecutionId,
    },
}

impl<E> ExecutionError<E>
where
    E: std::error::Error + 'static,
{
    /// Returns the category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::RemoteFailed { .. } => ErrorKind::RemoteFailure,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }
}
