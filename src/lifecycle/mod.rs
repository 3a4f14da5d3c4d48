//! Remote execution lifecycle: submit a workflow, then wait for it.

mod error;
mod runner;
mod submit;
mod wait;

pub use error::{ErrorKind, ExecutionError, FailureReason};
pub use runner::ActionRunner;
pub use submit::{ExecutionSubmitter, build_payload};
pub use wait::{DEFAULT_POLL_INTERVAL, ExecutionWaiter, WaitOutcome};

#[cfg(test)]
mod tests;
