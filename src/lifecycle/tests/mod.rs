//! Unit tests for the execution lifecycle.

use std::time::Duration;

use rstest::fixture;
use serde_json::json;

use crate::request::OperationRequest;
use crate::test_support::ScriptedOrchestrator;

mod wait;

pub(super) const FAST_POLL: Duration = Duration::from_millis(1);

#[fixture]
pub(super) fn orchestrator() -> ScriptedOrchestrator {
    ScriptedOrchestrator::new()
}

#[fixture]
pub(super) fn mount_request() -> OperationRequest {
    OperationRequest::builder()
        .deployment_id("storage")
        .instance_id("vm_abc123")
        .operation("maintenance.mount")
        .parameters(json!({"path": "/mnt/data", "params": {"fsType": "ext4"}}))
        .build()
        .unwrap_or_else(|err| panic!("request fixture should be valid: {err}"))
}
