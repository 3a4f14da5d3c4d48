//! Core library for the `cfy-mount` storage plugin.
//!
//! The crate submits single-instance `execute_operation` workflows to a
//! Cloudify manager and waits for them to finish (submit → poll until
//! terminal → classify), exposing the outcome to a storage driver host
//! through a fixed JSON protocol.

pub mod cloudify;
pub mod config;
pub mod execution;
pub mod lifecycle;
pub mod logging;
pub mod orchestrator;
pub mod plugin;
pub mod request;
#[cfg(test)]
pub mod test_helpers;
pub mod test_support;

pub use cloudify::{ClientSettings, CloudifyClient, CloudifyError};
pub use config::{ConfigError, MountConfig};
pub use execution::{Execution, ExecutionId, ExecutionRecord, ExecutionStatus, ProtocolError};
pub use lifecycle::{
    ActionRunner, ErrorKind, ExecutionError, ExecutionSubmitter, ExecutionWaiter, FailureReason,
    WaitOutcome,
};
pub use orchestrator::{Orchestrator, OrchestratorFuture};
pub use plugin::{MountPlugin, PluginCommand, PluginError, PluginResponse};
pub use request::{OperationRequest, OperationRequestBuilder, RequestError};
