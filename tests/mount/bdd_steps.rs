//! BDD step definitions for the mount plugin.

use cfy_mount::PluginCommand;
use cfy_mount::PluginResponse;
use cfy_mount::test_support::{failed_record, record};
use rstest_bdd_macros::{given, then, when};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

use super::test_helpers::{MountContext, MountResult};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[given("a mount plugin for deployment \"{deployment}\" and instance \"{instance}\"")]
fn mount_plugin(
    mut mount_context: MountContext,
    deployment: String,
    instance: String,
) -> MountContext {
    mount_context.deployment = deployment;
    mount_context.instance = instance;
    mount_context
}

#[given("the orchestrator accepts the execution \"{id}\" as \"{status}\"")]
fn accepts_execution(mut mount_context: MountContext, id: String, status: String) -> MountContext {
    mount_context.orchestrator.push_create(record(&id, &status));
    mount_context.execution_id = id;
    mount_context
}

#[given("the orchestrator then reports \"{status}\"")]
fn then_reports(mount_context: MountContext, status: String) -> MountContext {
    mount_context
        .orchestrator
        .push_status(&mount_context.execution_id, &status);
    mount_context
}

#[given("the execution then fails with \"{message}\"")]
fn then_fails(mount_context: MountContext, message: String) -> MountContext {
    mount_context
        .orchestrator
        .push_fetch(vec![failed_record(&mount_context.execution_id, &message)]);
    mount_context
}

#[given("the execution then disappears")]
fn then_disappears(mount_context: MountContext) -> MountContext {
    mount_context.orchestrator.push_fetch(Vec::new());
    mount_context
}

#[when("the host mounts \"{path}\" with options \"{options}\"")]
fn host_mounts(
    mount_context: MountContext,
    path: String,
    options: String,
) -> Result<MountContext, StepError> {
    handle(mount_context, &PluginCommand::Mount { path, options })
}

#[when("the host unmounts \"{path}\"")]
fn host_unmounts(mount_context: MountContext, path: String) -> Result<MountContext, StepError> {
    handle(mount_context, &PluginCommand::Unmount { path })
}

#[then("the plugin reports the volume as attached")]
fn reports_attached(mount_context: &MountContext) -> Result<(), StepError> {
    match &mount_context.outcome {
        Some(MountResult::Response(response)) if *response == PluginResponse::attached(true) => {
            Ok(())
        }
        other => Err(StepError::Assertion(format!(
            "expected an attached response, got {other:?}"
        ))),
    }
}

#[then("the plugin reports failure \"{message}\"")]
fn reports_failure(mount_context: &MountContext, message: String) -> Result<(), StepError> {
    match &mount_context.outcome {
        Some(MountResult::Failure(actual)) if actual.contains(message.as_str()) => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected failure containing {message:?}, got {other:?}"
        ))),
    }
}

#[then("the orchestrator was polled \"{count}\" times")]
fn polled_times(mount_context: &MountContext, count: usize) -> Result<(), StepError> {
    let actual = mount_context.orchestrator.fetch_calls();
    if actual == count {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} status checks, got {actual}"
        )))
    }
}

fn handle(mount_context: MountContext, command: &PluginCommand) -> Result<MountContext, StepError> {
    let runtime = Runtime::new().map_err(|err| StepError::Assertion(err.to_string()))?;
    let plugin = mount_context.plugin();
    let result = runtime.block_on(async { plugin.handle(command, &CancellationToken::new()).await });

    let outcome = match result {
        Ok(response) => MountResult::Response(response),
        Err(err) => MountResult::Failure(PluginResponse::failure(err.to_string()).to_json().map_err(
            |err| StepError::Assertion(format!("failure response should serialise: {err}")),
        )?),
    };

    Ok(MountContext {
        outcome: Some(outcome),
        ..mount_context
    })
}
