//! Shared fixtures for mount BDD scenarios.

use std::time::Duration;

use cfy_mount::test_support::ScriptedOrchestrator;
use cfy_mount::{ActionRunner, MountPlugin, PluginResponse};
use rstest::fixture;

pub const FAST_POLL: Duration = Duration::from_millis(1);

#[derive(Clone, Debug)]
pub struct MountContext {
    pub orchestrator: ScriptedOrchestrator,
    pub deployment: String,
    pub instance: String,
    pub execution_id: String,
    pub outcome: Option<MountResult>,
}

#[derive(Clone, Debug)]
pub enum MountResult {
    Response(PluginResponse),
    Failure(String),
}

impl MountContext {
    pub fn plugin(&self) -> MountPlugin<ScriptedOrchestrator> {
        let runner = ActionRunner::new(self.orchestrator.clone()).with_poll_interval(FAST_POLL);
        MountPlugin::new(runner, self.deployment.as_str(), self.instance.as_str())
    }
}

#[fixture]
pub fn mount_context() -> MountContext {
    MountContext {
        orchestrator: ScriptedOrchestrator::new(),
        deployment: String::from("storage"),
        instance: String::from("vm_1"),
        execution_id: String::new(),
        outcome: None,
    }
}
