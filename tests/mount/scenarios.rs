//! BDD scenarios for mount and unmount commands.

use rstest_bdd_macros::scenario;

use super::test_helpers::{MountContext, mount_context};

#[scenario(
    path = "tests/features/mount.feature",
    name = "Mount succeeds once the execution terminates"
)]
fn scenario_mount_succeeds(mount_context: MountContext) {
    let _ = mount_context;
}

#[scenario(
    path = "tests/features/mount.feature",
    name = "Unknown statuses keep the wait going"
)]
fn scenario_unknown_status_keeps_polling(mount_context: MountContext) {
    let _ = mount_context;
}

#[scenario(
    path = "tests/features/mount.feature",
    name = "Remote failure is reported to the host"
)]
fn scenario_remote_failure_reported(mount_context: MountContext) {
    let _ = mount_context;
}

#[scenario(
    path = "tests/features/mount.feature",
    name = "A vanished execution aborts the wait"
)]
fn scenario_vanished_execution_aborts(mount_context: MountContext) {
    let _ = mount_context;
}
