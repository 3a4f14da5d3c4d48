//! Execution data model shared by the submitter and the waiter.
//!
//! The orchestrator reports executions through a lenient wire record
//! ([`ExecutionRecord`]). The core only ever works with validated
//! [`Execution`] snapshots, so protocol violations such as a missing
//! identifier surface as [`ProtocolError`] at the boundary rather than deep
//! inside the polling loop.

use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Workflow used to run a single operation against one node instance.
pub const EXECUTE_OPERATION_WORKFLOW: &str = "execute_operation";

/// Opaque identifier assigned to an execution by the orchestrator.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(String);

impl ExecutionId {
    /// Wraps an orchestrator supplied identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrows the identifier as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for ExecutionId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl AsRef<str> for ExecutionId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Deref for ExecutionId {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status vocabulary reported by the orchestrator.
///
/// The orchestrator does not publish a closed set of statuses. Anything
/// outside the known vocabulary is kept verbatim in [`Self::Other`] and is
/// treated as still in flight.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ExecutionStatus {
    /// Accepted but not yet picked up by a worker.
    Pending,
    /// Running.
    Started,
    /// Finished successfully.
    Terminated,
    /// Finished with an error.
    Failed,
    /// Unrecognised status string; polled like any non-terminal state.
    Other(String),
}

impl ExecutionStatus {
    /// Parses a status string. Never fails: unknown values map to
    /// [`Self::Other`].
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "pending" => Self::Pending,
            "started" => Self::Started,
            "terminated" => Self::Terminated,
            "failed" => Self::Failed,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Returns the wire representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Started => "started",
            Self::Terminated => "terminated",
            Self::Failed => "failed",
            Self::Other(value) => value.as_str(),
        }
    }

    /// Returns `true` once the execution can no longer change state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated | Self::Failed)
    }

    /// Returns `true` for statuses outside the known vocabulary.
    #[must_use]
    pub const fn is_unrecognised(&self) -> bool {
        matches!(self, Self::Other(_))
    }

    /// Position in the known state machine, `None` for unknown statuses.
    #[must_use]
    pub const fn rank(&self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Started => Some(1),
            Self::Terminated | Self::Failed => Some(2),
            Self::Other(_) => None,
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ExecutionStatus {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

/// Raw execution as returned by the orchestrator.
///
/// Every field is optional so that a malformed response still decodes and
/// can be classified as a protocol error instead of a transport failure.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ExecutionRecord {
    /// Orchestrator assigned identifier.
    #[serde(default)]
    pub id: Option<String>,
    /// Current status string.
    #[serde(default)]
    pub status: Option<String>,
    /// Workflow the execution runs.
    #[serde(default)]
    pub workflow_id: Option<String>,
    /// Deployment the execution targets.
    #[serde(default)]
    pub deployment_id: Option<String>,
    /// Parameters echoed back by the orchestrator.
    #[serde(default)]
    pub parameters: Option<Value>,
    /// Failure description, populated for failed executions.
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Validated snapshot of a remote execution.
#[derive(Clone, Debug, PartialEq)]
pub struct Execution {
    /// Orchestrator assigned identifier.
    pub id: ExecutionId,
    /// Status at the time of the snapshot.
    pub status: ExecutionStatus,
    /// Workflow the execution runs, when reported.
    pub workflow_id: Option<String>,
    /// Deployment the execution targets, when reported.
    pub deployment_id: Option<String>,
    /// Parameters echoed back by the orchestrator.
    pub parameters: Value,
    /// Failure description as reported; may be empty for failed runs.
    pub error_message: Option<String>,
}

impl TryFrom<ExecutionRecord> for Execution {
    type Error = ProtocolError;

    fn try_from(record: ExecutionRecord) -> Result<Self, Self::Error> {
        let id = record
            .id
            .filter(|value| !value.trim().is_empty())
            .map(ExecutionId::new)
            .ok_or(ProtocolError::MissingIdentifier)?;
        let status = record
            .status
            .as_deref()
            .map(ExecutionStatus::parse)
            .ok_or_else(|| ProtocolError::MissingStatus {
                execution_id: id.clone(),
            })?;

        Ok(Self {
            id,
            status,
            workflow_id: record.workflow_id,
            deployment_id: record.deployment_id,
            parameters: record.parameters.unwrap_or(Value::Null),
            error_message: record.error_message,
        })
    }
}

/// Parameters of the `execute_operation` workflow.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExecuteOperationParameters {
    /// Dotted operation name, for example `maintenance.mount`.
    pub operation: String,
    /// Node filter; always empty because the call is instance scoped.
    pub node_ids: Vec<String>,
    /// Type filter; always empty because the call is instance scoped.
    pub type_names: Vec<String>,
    /// Dependency ordering; always `false` for a single instance.
    pub run_by_dependency_order: bool,
    /// Left unset so the workflow default applies.
    pub allow_kwargs_override: Option<bool>,
    /// The single targeted node instance.
    pub node_instance_ids: Vec<String>,
    /// Caller parameters passed to the operation.
    pub operation_kwargs: Value,
}

/// Body of an execution creation request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExecutionPost {
    /// Workflow to start.
    pub workflow_id: String,
    /// Deployment the workflow runs against.
    pub deployment_id: String,
    /// Workflow parameters.
    pub parameters: ExecuteOperationParameters,
}

/// Response shape violations reported by the orchestrator.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ProtocolError {
    /// The creation response carried no execution identifier.
    #[error("orchestrator response did not include an execution id")]
    MissingIdentifier,
    /// An execution was reported without a status.
    #[error("execution {execution_id} was reported without a status")]
    MissingStatus {
        /// Execution identifier.
        execution_id: ExecutionId,
    },
    /// Re-fetching the execution returned no match.
    #[error("execution {execution_id} was not found")]
    ExecutionNotFound {
        /// Execution identifier.
        execution_id: ExecutionId,
    },
    /// Re-fetching the execution returned more than one match.
    #[error("execution {execution_id} matched {count} executions, expected exactly one")]
    AmbiguousExecution {
        /// Execution identifier.
        execution_id: ExecutionId,
        /// Number of executions returned.
        count: usize,
    },
}
