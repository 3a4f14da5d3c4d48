//! Storage driver plugin protocol.
//!
//! The plugin host calls the binary synchronously and parses a single JSON
//! document from stdout. Every outcome, including failures, is reported in
//! one of the fixed shapes produced by [`PluginResponse`].

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::lifecycle::{ActionRunner, ExecutionError};
use crate::orchestrator::Orchestrator;
use crate::request::{OperationRequest, RequestError};

/// Operation that mounts a filesystem on the target instance.
pub const MOUNT_OPERATION: &str = "maintenance.mount";
/// Operation that unmounts a filesystem on the target instance.
pub const UNMOUNT_OPERATION: &str = "maintenance.unmount";

const STATUS_SUCCESS: &str = "Success";
const STATUS_NOT_SUPPORTED: &str = "Not supported";

/// Commands the plugin host may issue.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PluginCommand {
    /// Handshake advertising the plugin capabilities.
    Init,
    /// Mount `path` using the host supplied JSON options.
    Mount {
        /// Mount point on the node.
        path: String,
        /// Raw JSON options from the host.
        options: String,
    },
    /// Unmount `path`.
    Unmount {
        /// Mount point on the node.
        path: String,
    },
}

/// Capabilities advertised during `init`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct Capabilities {
    /// Whether the plugin implements attach/detach.
    pub attach: bool,
}

/// JSON document written to stdout for the plugin host.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PluginResponse {
    /// Reply to `init`.
    Init {
        /// Always `Success`.
        status: &'static str,
        /// Advertised capabilities.
        capabilities: Capabilities,
    },
    /// Reply to a successful mount or unmount.
    Mount {
        /// Always `Success`.
        status: &'static str,
        /// `true` after a mount, `false` after an unmount.
        attached: bool,
    },
    /// Reply to any failure.
    Failure {
        /// Always `Not supported`.
        status: &'static str,
        /// Error description.
        message: String,
    },
}

impl PluginResponse {
    /// Reply to `init`.
    #[must_use]
    pub const fn init() -> Self {
        Self::Init {
            status: STATUS_SUCCESS,
            capabilities: Capabilities { attach: false },
        }
    }

    /// Reply to a successful mount (`attached = true`) or unmount.
    #[must_use]
    pub const fn attached(attached: bool) -> Self {
        Self::Mount {
            status: STATUS_SUCCESS,
            attached,
        }
    }

    /// Reply describing a failure.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            status: STATUS_NOT_SUPPORTED,
            message: message.into(),
        }
    }

    /// Serialises the response to a single JSON line.
    ///
    /// # Errors
    ///
    /// Returns the serialiser error; the fixed shapes never fail in practice.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Errors raised while handling a plugin command.
#[derive(Debug, Error)]
pub enum PluginError<E>
where
    E: std::error::Error + 'static,
{
    /// The host supplied options that are not a JSON object.
    #[error("invalid mount options: {0}")]
    InvalidOptions(String),
    /// The operation request could not be built.
    #[error("invalid operation request: {0}")]
    Request(#[from] RequestError),
    /// The remote operation failed.
    #[error(transparent)]
    Execution(#[from] ExecutionError<E>),
}

/// Parameters passed to the mount operation.
///
/// # Errors
///
/// Returns [`PluginError::InvalidOptions`] when `options` is not a JSON
/// object.
pub fn mount_parameters<E>(path: &str, options: &str) -> Result<Value, PluginError<E>>
where
    E: std::error::Error + 'static,
{
    let parsed: Value = serde_json::from_str(options)
        .map_err(|err| PluginError::InvalidOptions(err.to_string()))?;
    let Value::Object(params) = parsed else {
        return Err(PluginError::InvalidOptions(String::from(
            "options must be a JSON object",
        )));
    };

    let mut payload = Map::new();
    payload.insert(String::from("path"), Value::String(path.to_owned()));
    payload.insert(String::from("params"), Value::Object(params));
    Ok(Value::Object(payload))
}

/// Parameters passed to the unmount operation.
#[must_use]
pub fn unmount_parameters(path: &str) -> Value {
    let mut payload = Map::new();
    payload.insert(String::from("path"), Value::String(path.to_owned()));
    Value::Object(payload)
}

/// Handles plugin commands by running maintenance operations on a single
/// node instance.
#[derive(Debug)]
pub struct MountPlugin<O> {
    runner: ActionRunner<O>,
    deployment_id: String,
    instance_id: String,
}

impl<O> MountPlugin<O>
where
    O: Orchestrator,
{
    /// Creates a plugin targeting `instance_id` in `deployment_id`.
    #[must_use]
    pub fn new(
        runner: ActionRunner<O>,
        deployment_id: impl Into<String>,
        instance_id: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            deployment_id: deployment_id.into(),
            instance_id: instance_id.into(),
        }
    }

    /// Handles one command and returns the success response.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError`] when the options are invalid or the remote
    /// operation does not succeed. Callers flatten the error with
    /// [`PluginResponse::failure`].
    pub async fn handle(
        &self,
        command: &PluginCommand,
        cancel: &CancellationToken,
    ) -> Result<PluginResponse, PluginError<O::Error>> {
        match command {
            PluginCommand::Init => Ok(PluginResponse::init()),
            PluginCommand::Mount { path, options } => {
                let params = mount_parameters(path, options)?;
                self.run(MOUNT_OPERATION, params, cancel).await?;
                Ok(PluginResponse::attached(true))
            }
            PluginCommand::Unmount { path } => {
                self.run(UNMOUNT_OPERATION, unmount_parameters(path), cancel)
                    .await?;
                Ok(PluginResponse::attached(false))
            }
        }
    }

    async fn run(
        &self,
        operation: &str,
        parameters: Value,
        cancel: &CancellationToken,
    ) -> Result<(), PluginError<O::Error>> {
        let request = OperationRequest::builder()
            .deployment_id(&self.deployment_id)
            .instance_id(&self.instance_id)
            .operation(operation)
            .parameters(parameters)
            .build()?;
        let outcome = self.runner.run(&request, cancel).await?;
        info!(
            operation,
            execution_id = %outcome.execution.id,
            polls = outcome.polls,
            "operation completed"
        );
        Ok(())
    }
}
