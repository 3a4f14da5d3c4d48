//! Submit-then-wait composition used by the plugin entry points.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::orchestrator::Orchestrator;
use crate::request::OperationRequest;

use super::{DEFAULT_POLL_INTERVAL, ExecutionError, ExecutionSubmitter, ExecutionWaiter, WaitOutcome};

/// Runs one operation end to end: a single submission followed by a full
/// wait for the execution to terminate.
///
/// The runner owns its orchestrator client for the duration of the
/// invocation, so any pooled connection is released when the runner is
/// dropped, whichever way [`Self::run`] exits.
#[derive(Debug)]
pub struct ActionRunner<O> {
    orchestrator: O,
    poll_interval: Duration,
    wait_timeout: Option<Duration>,
}

impl<O> ActionRunner<O>
where
    O: Orchestrator,
{
    /// Creates a runner with the default poll interval and no deadline.
    #[must_use]
    pub const fn new(orchestrator: O) -> Self {
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

    /// Bounds the wait for the execution to finish.
    #[must_use]
    pub const fn with_wait_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Submits the operation and waits for it to finish.
    ///
    /// # Errors
    ///
    /// Returns any [`ExecutionError`] raised by submission or by the wait;
    /// use [`ExecutionError::kind`] to tell the categories apart.
    pub async fn run(
        &self,
        request: &OperationRequest,
        cancel: &CancellationToken,
    ) -> Result<WaitOutcome, ExecutionError<O::Error>> {
        let execution = ExecutionSubmitter::new(&self.orchestrator)
            .submit(request)
            .await?;

        ExecutionWaiter::new(&self.orchestrator)
            .with_poll_interval(self.poll_interval)
            .with_wait_timeout(self.wait_timeout)
            .wait(execution, cancel)
            .await
    }
}
