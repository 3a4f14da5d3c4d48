//! BDD scenarios covering mount and unmount through scripted executions.

mod bdd_steps;
mod scenarios;
mod test_helpers;
