//! Tests for the execution polling loop.

use std::time::Duration;

use rstest::rstest;
use tokio_util::sync::CancellationToken;

use crate::execution::{Execution, ExecutionStatus, ProtocolError};
use crate::lifecycle::{ErrorKind, ExecutionError, ExecutionWaiter, FailureReason};
use crate::test_support::{ScriptedOrchestrator, failed_record, record};

use super::{FAST_POLL, orchestrator};

fn snapshot(id: &str, status: &str) -> Execution {
    Execution::try_from(record(id, status))
        .unwrap_or_else(|err| panic!("snapshot fixture should be valid: {err}"))
}

fn waiter(orchestrator: &ScriptedOrchestrator) -> ExecutionWaiter<'_, ScriptedOrchestrator> {
    ExecutionWaiter::new(orchestrator).with_poll_interval(FAST_POLL)
}

#[rstest]
#[tokio::test]
async fn polls_through_unrecognised_statuses(orchestrator: ScriptedOrchestrator) {
    orchestrator.push_status("ex-1", "queued");
    orchestrator.push_status("ex-1", "started");
    orchestrator.push_status("ex-1", "terminated");

    let outcome = waiter(&orchestrator)
        .wait(snapshot("ex-1", "pending"), &CancellationToken::new())
        .await
        .unwrap_or_else(|err| panic!("wait should succeed: {err}"));

    assert_eq!(outcome.execution.status, ExecutionStatus::Terminated);
    assert_eq!(outcome.polls, 3);
    assert_eq!(orchestrator.fetch_calls(), 3);
}

#[rstest]
#[case("terminated")]
#[case("failed")]
#[tokio::test]
async fn terminal_submission_status_skips_polling(
    orchestrator: ScriptedOrchestrator,
    #[case] status: &str,
) {
    let result = waiter(&orchestrator)
        .wait(snapshot("ex-1", status), &CancellationToken::new())
        .await;

    assert_eq!(orchestrator.fetch_calls(), 0);
    assert_eq!(result.is_ok(), status == "terminated");
}

#[rstest]
#[tokio::test]
async fn stops_fetching_once_terminal(orchestrator: ScriptedOrchestrator) {
    orchestrator.push_status("ex-1", "terminated");
    orchestrator.push_status("ex-1", "started");

    let outcome = waiter(&orchestrator)
        .wait(snapshot("ex-1", "started"), &CancellationToken::new())
        .await
        .unwrap_or_else(|err| panic!("wait should succeed: {err}"));

    assert_eq!(outcome.polls, 1);
    assert_eq!(orchestrator.fetch_calls(), 1);
}

#[rstest]
#[tokio::test]
async fn failed_execution_carries_orchestrator_message(orchestrator: ScriptedOrchestrator) {
    orchestrator.push_fetch(vec![failed_record("ex-2", "disk full")]);

    let err = waiter(&orchestrator)
        .wait(snapshot("ex-2", "started"), &CancellationToken::new())
        .await
        .expect_err("failed execution should be an error");

    assert_eq!(err.kind(), ErrorKind::RemoteFailure);
    assert_eq!(err.to_string(), "disk full");
}

#[rstest]
#[tokio::test]
async fn failed_execution_without_message_is_marked_empty(orchestrator: ScriptedOrchestrator) {
    orchestrator.push_fetch(vec![failed_record("ex-3", "")]);

    let err = waiter(&orchestrator)
        .wait(snapshot("ex-3", "pending"), &CancellationToken::new())
        .await
        .expect_err("failed execution should be an error");

    assert!(
        matches!(
            err,
            ExecutionError::RemoteFailed {
                reason: FailureReason::Empty,
                ..
            }
        ),
        "unexpected error: {err:?}"
    );
    assert_eq!(err.to_string(), "execution failed without an error message");
}

#[rstest]
#[tokio::test]
async fn whitespace_failure_message_is_reported_verbatim(orchestrator: ScriptedOrchestrator) {
    orchestrator.push_fetch(vec![failed_record("ex-w", "   ")]);

    let err = waiter(&orchestrator)
        .wait(snapshot("ex-w", "pending"), &CancellationToken::new())
        .await
        .expect_err("failed execution should be an error");

    assert!(
        matches!(
            err,
            ExecutionError::RemoteFailed {
                reason: FailureReason::Message(ref text),
                ..
            } if text == "   "
        ),
        "unexpected error: {err:?}"
    );
}

#[rstest]
#[tokio::test]
async fn missing_execution_aborts_without_retrying(orchestrator: ScriptedOrchestrator) {
    orchestrator.push_fetch(Vec::new());
    orchestrator.push_status("ex-4", "terminated");

    let err = waiter(&orchestrator)
        .wait(snapshot("ex-4", "pending"), &CancellationToken::new())
        .await
        .expect_err("zero matches should abort");

    assert!(
        matches!(
            err,
            ExecutionError::Protocol(ProtocolError::ExecutionNotFound { .. })
        ),
        "unexpected error: {err:?}"
    );
    assert_eq!(orchestrator.fetch_calls(), 1);
}

#[rstest]
#[tokio::test]
async fn ambiguous_execution_aborts_without_retrying(orchestrator: ScriptedOrchestrator) {
    orchestrator.push_fetch(vec![record("ex-5", "started"), record("ex-5", "started")]);
    orchestrator.push_status("ex-5", "terminated");

    let err = waiter(&orchestrator)
        .wait(snapshot("ex-5", "pending"), &CancellationToken::new())
        .await
        .expect_err("two matches should abort");

    assert!(
        matches!(
            err,
            ExecutionError::Protocol(ProtocolError::AmbiguousExecution { count: 2, .. })
        ),
        "unexpected error: {err:?}"
    );
    assert_eq!(orchestrator.fetch_calls(), 1);
}

#[rstest]
#[tokio::test]
async fn mismatched_identifier_is_treated_as_missing(orchestrator: ScriptedOrchestrator) {
    orchestrator.push_status("someone-else", "terminated");

    let err = waiter(&orchestrator)
        .wait(snapshot("ex-6", "pending"), &CancellationToken::new())
        .await
        .expect_err("foreign execution should abort");

    assert_eq!(err.kind(), ErrorKind::Protocol);
}

#[rstest]
#[tokio::test]
async fn fetch_transport_error_propagates(orchestrator: ScriptedOrchestrator) {
    orchestrator.push_fetch_error("503 service unavailable");

    let err = waiter(&orchestrator)
        .wait(snapshot("ex-7", "started"), &CancellationToken::new())
        .await
        .expect_err("transport error should abort");

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(orchestrator.fetch_calls(), 1);
}

#[rstest]
#[tokio::test]
async fn deadline_expiry_is_a_timeout(orchestrator: ScriptedOrchestrator) {
    orchestrator.fetch_forever(vec![record("ex-8", "started")]);

    let err = waiter(&orchestrator)
        .with_wait_timeout(Some(Duration::from_millis(20)))
        .wait(snapshot("ex-8", "pending"), &CancellationToken::new())
        .await
        .expect_err("wait should time out");

    assert!(
        matches!(err, ExecutionError::Timeout { ref execution_id, .. } if execution_id.as_str() == "ex-8"),
        "unexpected error: {err:?}"
    );
    assert_eq!(err.kind(), ErrorKind::Timeout);
}

#[rstest]
#[tokio::test]
async fn cancellation_interrupts_the_sleep(orchestrator: ScriptedOrchestrator) {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        trigger.cancel();
    });

    let err = ExecutionWaiter::new(&orchestrator)
        .with_poll_interval(Duration::from_secs(3600))
        .wait(snapshot("ex-9", "pending"), &cancel)
        .await
        .expect_err("wait should be cancelled");

    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(orchestrator.fetch_calls(), 0);
}

#[rstest]
#[tokio::test]
async fn already_cancelled_token_stops_before_polling(orchestrator: ScriptedOrchestrator) {
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = waiter(&orchestrator)
        .wait(snapshot("ex-10", "pending"), &cancel)
        .await
        .expect_err("wait should be cancelled");

    assert_eq!(err.kind(), ErrorKind::Cancelled);
}

#[rstest]
#[tokio::test]
async fn deadline_interrupts_an_in_flight_fetch(orchestrator: ScriptedOrchestrator) {
    orchestrator.stall_fetches();

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        waiter(&orchestrator)
            .with_wait_timeout(Some(Duration::from_millis(50)))
            .wait(snapshot("ex-11", "pending"), &CancellationToken::new()),
    )
    .await
    .unwrap_or_else(|_| panic!("deadline should interrupt the hanging fetch"));

    let err = result.expect_err("wait should time out");
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert_eq!(orchestrator.fetch_calls(), 1);
}

#[rstest]
#[tokio::test]
async fn cancellation_interrupts_an_in_flight_fetch(orchestrator: ScriptedOrchestrator) {
    orchestrator.stall_fetches();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        waiter(&orchestrator).wait(snapshot("ex-12", "pending"), &cancel),
    )
    .await
    .unwrap_or_else(|_| panic!("cancellation should interrupt the hanging fetch"));

    let err = result.expect_err("wait should be cancelled");
    assert!(
        matches!(err, ExecutionError::Cancelled { ref execution_id } if execution_id.as_str() == "ex-12"),
        "unexpected error: {err:?}"
    );
    assert_eq!(orchestrator.fetch_calls(), 1);
}
