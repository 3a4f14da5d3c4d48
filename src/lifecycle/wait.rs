//! Polls an execution until it reaches a terminal state.

use std::time::Duration;

use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::execution::{Execution, ExecutionId, ExecutionStatus, ProtocolError};
use crate::orchestrator::Orchestrator;

use super::{ExecutionError, FailureReason};

/// Interval between two status fetches.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Terminal snapshot of a successfully finished execution.
#[derive(Clone, Debug, PartialEq)]
pub struct WaitOutcome {
    /// Last snapshot fetched from the orchestrator.
    pub execution: Execution,
    /// Number of status fetches performed while waiting.
    pub polls: u32,
}

/// Waits for executions to finish by polling the orchestrator.
#[derive(Debug)]
pub struct ExecutionWaiter<'o, O> {
    orchestrator: &'o O,
    poll_interval: Duration,
    wait_timeout: Option<Duration>,
}

impl<'o, O> ExecutionWaiter<'o, O>
where
    O: Orchestrator,
{
    /// Creates a waiter with the default poll interval and no deadline.
    #[must_use]
    pub const fn new(orchestrator: &'o O) -> Self {
        Self {
            orchestrator,
            poll_interval: DEFAULT_POLL_INTERVAL,
            wait_timeout: None,
        }
    }

    /// Overrides the polling interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Bounds the total wait. `None` waits until the execution finishes.
    #[must_use]
    pub const fn with_wait_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Polls `execution` until it terminates, then classifies the outcome.
    ///
    /// The wait stops early when `cancel` fires or the configured deadline
    /// expires. Either interrupts a sleep or an in-flight fetch; the fetch
    /// future is dropped, which releases its connection.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::RemoteFailed`] when the execution ends in
    /// `failed`, [`ExecutionError::Protocol`] when a fetch does not return
    /// exactly one execution, [`ExecutionError::Transport`] when a fetch
    /// fails, [`ExecutionError::Timeout`] when the deadline expires, and
    /// [`ExecutionError::Cancelled`] when `cancel` fires.
    pub async fn wait(
        &self,
        execution: Execution,
        cancel: &CancellationToken,
    ) -> Result<WaitOutcome, ExecutionError<O::Error>> {
        let execution_id = execution.id.clone();
        let started = Instant::now();
        let deadline = async {
            match self.wait_timeout {
                Some(limit) => sleep(limit).await,
                None => std::future::pending::<()>().await,
            }
        };

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                warn!(execution_id = %execution_id, "wait cancelled");
                return Err(ExecutionError::Cancelled { execution_id });
            }
            () = deadline => {
                let waited = started.elapsed();
                warn!(execution_id = %execution_id, ?waited, "wait deadline expired");
                return Err(ExecutionError::Timeout { execution_id, waited });
            }
            result = self.poll_until_terminal(execution) => result?,
        };

        Self::classify(outcome)
    }

    /// Fetches the current snapshot of an execution.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::ExecutionNotFound`] when nothing matches,
    /// [`ProtocolError::AmbiguousExecution`] when several executions match,
    /// and [`ExecutionError::Transport`] when the call fails.
    pub async fn fetch(&self, id: &ExecutionId) -> Result<Execution, ExecutionError<O::Error>> {
        let mut records = self
            .orchestrator
            .list_executions(id)
            .await
            .map_err(ExecutionError::Transport)?;

        let count = records.len();
        if count > 1 {
            return Err(ProtocolError::AmbiguousExecution {
                execution_id: id.clone(),
                count,
            }
            .into());
        }
        let Some(record) = records.pop() else {
            return Err(ProtocolError::ExecutionNotFound {
                execution_id: id.clone(),
            }
            .into());
        };

        let execution = Execution::try_from(record)?;
        if execution.id != *id {
            warn!(
                requested = %id,
                returned = %execution.id,
                "orchestrator returned a different execution"
            );
            return Err(ProtocolError::ExecutionNotFound {
                execution_id: id.clone(),
            }
            .into());
        }
        Ok(execution)
    }

    async fn poll_until_terminal(
        &self,
        mut current: Execution,
    ) -> Result<WaitOutcome, ExecutionError<O::Error>> {
        let mut polls = 0_u32;
        while !current.status.is_terminal() {
            debug!(
                execution_id = %current.id,
                status = %current.status,
                "checking execution status"
            );
            sleep(self.poll_interval).await;

            let next = self.fetch(&current.id).await?;
            polls = polls.saturating_add(1);
            log_transition(&next.id, &current.status, &next.status);
            current = next;
        }

        info!(
            execution_id = %current.id,
            status = %current.status,
            polls,
            "execution finished"
        );
        Ok(WaitOutcome {
            execution: current,
            polls,
        })
    }

    fn classify(outcome: WaitOutcome) -> Result<WaitOutcome, ExecutionError<O::Error>> {
        if outcome.execution.status != ExecutionStatus::Failed {
            return Ok(outcome);
        }

        let reason = FailureReason::from_message(outcome.execution.error_message.as_deref());
        if reason == FailureReason::Empty {
            warn!(
                execution_id = %outcome.execution.id,
                "execution failed without an error message"
            );
        }
        Err(ExecutionError::RemoteFailed {
            execution_id: outcome.execution.id,
            reason,
        })
    }
}

fn log_transition(id: &ExecutionId, previous: &ExecutionStatus, next: &ExecutionStatus) {
    if next.is_unrecognised() {
        warn!(execution_id = %id, status = %next, "unrecognised execution status, still polling");
        return;
    }
    let regressed = matches!(
        (previous.rank(), next.rank()),
        (Some(before), Some(after)) if after < before
    );
    if regressed {
        warn!(
            execution_id = %id,
            from = %previous,
            to = %next,
            "execution status moved backwards"
        );
    }
}
