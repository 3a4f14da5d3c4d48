//! Test support utilities shared across unit and integration tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::execution::{ExecutionId, ExecutionPost, ExecutionRecord};
use crate::orchestrator::{Orchestrator, OrchestratorFuture};

/// Transport failure produced by [`ScriptedOrchestrator`].
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("scripted transport failure: {0}")]
pub struct ScriptedError(pub String);

/// Scripted orchestrator that replays pre-seeded responses in FIFO order
/// and records every call made through it.
///
/// Clones share the same script, so a test can keep a handle for
/// assertions after moving a clone into the code under test.
#[derive(Clone, Debug, Default)]
pub struct ScriptedOrchestrator {
    state: Arc<Mutex<ScriptState>>,
}

#[derive(Debug, Default)]
struct ScriptState {
    creates: VecDeque<Result<ExecutionRecord, ScriptedError>>,
    fetches: VecDeque<Result<Vec<ExecutionRecord>, ScriptedError>>,
    fallback_fetch: Option<Vec<ExecutionRecord>>,
    stall_fetches: bool,
    posts: Vec<ExecutionPost>,
    fetched_ids: Vec<ExecutionId>,
}

impl ScriptedOrchestrator {
    /// Creates an orchestrator with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues the response to the next execution creation.
    pub fn push_create(&self, record: ExecutionRecord) {
        self.state().creates.push_back(Ok(record));
    }

    /// Queues a transport failure for the next execution creation.
    pub fn push_create_error(&self, message: &str) {
        self.state()
            .creates
            .push_back(Err(ScriptedError(message.to_owned())));
    }

    /// Queues the items returned by the next execution lookup.
    pub fn push_fetch(&self, records: Vec<ExecutionRecord>) {
        self.state().fetches.push_back(Ok(records));
    }

    /// Queues a single matching execution for the next lookup.
    pub fn push_status(&self, id: &str, status: &str) {
        self.push_fetch(vec![record(id, status)]);
    }

    /// Queues a transport failure for the next execution lookup.
    pub fn push_fetch_error(&self, message: &str) {
        self.state()
            .fetches
            .push_back(Err(ScriptedError(message.to_owned())));
    }

    /// Answers every lookup with `records` once the queue is exhausted.
    pub fn fetch_forever(&self, records: Vec<ExecutionRecord>) {
        self.state().fallback_fetch = Some(records);
    }

    /// Makes every later lookup hang after it has been recorded, as if the
    /// orchestrator never answered.
    pub fn stall_fetches(&self) {
        self.state().stall_fetches = true;
    }

    /// Returns every creation payload submitted so far.
    #[must_use]
    pub fn posts(&self) -> Vec<ExecutionPost> {
        self.state().posts.clone()
    }

    /// Returns the number of execution lookups performed so far.
    #[must_use]
    pub fn fetch_calls(&self) -> usize {
        self.state().fetched_ids.len()
    }

    /// Returns the identifiers looked up so far, in call order.
    #[must_use]
    pub fn fetched_ids(&self) -> Vec<ExecutionId> {
        self.state().fetched_ids.clone()
    }
}

impl Orchestrator for ScriptedOrchestrator {
    type Error = ScriptedError;

    fn create_execution<'a>(
        &'a self,
        post: &'a ExecutionPost,
    ) -> OrchestratorFuture<'a, ExecutionRecord, Self::Error> {
        Box::pin(async move {
            let mut state = self.state();
            state.posts.push(post.clone());
            state
                .creates
                .pop_front()
                .unwrap_or_else(|| Err(ScriptedError(String::from("no scripted create response"))))
        })
    }

    fn list_executions<'a>(
        &'a self,
        id: &'a ExecutionId,
    ) -> OrchestratorFuture<'a, Vec<ExecutionRecord>, Self::Error> {
        Box::pin(async move {
            let stalled = {
                let mut recorded = self.state();
                recorded.fetched_ids.push(id.clone());
                recorded.stall_fetches
            };
            if stalled {
                std::future::pending::<()>().await;
            }

            let mut state = self.state();
            if let Some(next) = state.fetches.pop_front() {
                return next;
            }
            state
                .fallback_fetch
                .clone()
                .ok_or_else(|| ScriptedError(String::from("no scripted fetch response")))
        })
    }
}

/// Builds an execution record with the given identifier and status.
#[must_use]
pub fn record(id: &str, status: &str) -> ExecutionRecord {
    ExecutionRecord {
        id: Some(id.to_owned()),
        status: Some(status.to_owned()),
        workflow_id: Some(String::from(crate::execution::EXECUTE_OPERATION_WORKFLOW)),
        ..ExecutionRecord::default()
    }
}

/// Builds a failed execution record carrying `message`.
#[must_use]
pub fn failed_record(id: &str, message: &str) -> ExecutionRecord {
    ExecutionRecord {
        error_message: Some(message.to_owned()),
        ..record(id, "failed")
    }
}
