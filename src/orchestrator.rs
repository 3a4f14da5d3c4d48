//! Seam between the execution lifecycle and the orchestration REST API.

use std::future::Future;
use std::pin::Pin;

use crate::execution::{ExecutionId, ExecutionPost, ExecutionRecord};

/// Future returned by orchestrator calls.
pub type OrchestratorFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Minimal interface to the orchestrator's execution endpoints.
///
/// Each method performs exactly one request. Implementations must not retry:
/// execution creation is not idempotent, and retry policy belongs to the
/// transport.
pub trait Orchestrator {
    /// Transport specific error type (network, authentication, decoding).
    type Error: std::error::Error + Send + Sync + 'static;

    /// Starts a new execution and returns the orchestrator's record of it.
    fn create_execution<'a>(
        &'a self,
        post: &'a ExecutionPost,
    ) -> OrchestratorFuture<'a, ExecutionRecord, Self::Error>;

    /// Lists executions matching the given identifier.
    fn list_executions<'a>(
        &'a self,
        id: &'a ExecutionId,
    ) -> OrchestratorFuture<'a, Vec<ExecutionRecord>, Self::Error>;
}
