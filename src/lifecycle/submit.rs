//! Starts an `execute_operation` workflow for a single node instance.

use tracing::info;

use crate::execution::{
    EXECUTE_OPERATION_WORKFLOW, ExecuteOperationParameters, Execution, ExecutionPost,
};
use crate::orchestrator::Orchestrator;
use crate::request::OperationRequest;

use super::ExecutionError;

/// Builds the workflow payload for an operation request.
///
/// The payload is always instance scoped: node and type filters are empty,
/// dependency ordering is disabled, and the instance list holds exactly the
/// requested instance.
#[must_use]
pub fn build_payload(request: &OperationRequest) -> ExecutionPost {
    ExecutionPost {
        workflow_id: String::from(EXECUTE_OPERATION_WORKFLOW),
        deployment_id: request.deployment_id.clone(),
        parameters: ExecuteOperationParameters {
            operation: request.operation.clone(),
            node_ids: Vec::new(),
            type_names: Vec::new(),
            run_by_dependency_order: false,
            allow_kwargs_override: None,
            node_instance_ids: vec![request.instance_id.clone()],
            operation_kwargs: request.parameters.clone(),
        },
    }
}

/// Submits operation requests to an orchestrator.
#[derive(Debug)]
pub struct ExecutionSubmitter<'o, O> {
    orchestrator: &'o O,
}

impl<'o, O> ExecutionSubmitter<'o, O>
where
    O: Orchestrator,
{
    /// Creates a submitter borrowing the given orchestrator.
    #[must_use]
    pub const fn new(orchestrator: &'o O) -> Self {
        Self { orchestrator }
    }

    /// Starts the operation and returns the created execution.
    ///
    /// Exactly one creation call is made. Failures are never retried, since
    /// the orchestrator may already have accepted the execution.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::InvalidRequest`] for a malformed request,
    /// [`ExecutionError::Transport`] when the call fails, and
    /// [`ExecutionError::Protocol`] when the response lacks an identifier or
    /// status.
    pub async fn submit(
        &self,
        request: &OperationRequest,
    ) -> Result<Execution, ExecutionError<O::Error>> {
        request.validate()?;
        let payload = build_payload(request);
        info!(
            operation = %request.operation,
            deployment = %request.deployment_id,
            instance = %request.instance_id,
            "submitting execution"
        );

        let record = self
            .orchestrator
            .create_execution(&payload)
            .await
            .map_err(ExecutionError::Transport)?;
        let execution = Execution::try_from(record)?;

        info!(
            execution_id = %execution.id,
            status = %execution.status,
            "execution created"
        );
        Ok(execution)
    }
}
