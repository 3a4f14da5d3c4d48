//! Command-line interface definitions for `cfy-mount`.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::Parser;

/// Top-level CLI for the `cfy-mount` binary.
#[derive(Debug, Parser)]
#[command(
    name = "cfy-mount",
    version,
    about = "Storage driver plugin that mounts volumes through Cloudify maintenance operations"
)]
pub(crate) enum Cli {
    /// Report plugin capabilities to the storage host.
    #[command(name = "init", about = "Report plugin capabilities to the storage host")]
    Init,
    /// Mount a volume by running `maintenance.mount` on the configured instance.
    #[command(name = "mount", about = "Run maintenance.mount and wait for it to finish")]
    Mount(MountCommand),
    /// Unmount a volume by running `maintenance.unmount` on the configured instance.
    #[command(name = "unmount", about = "Run maintenance.unmount and wait for it to finish")]
    Unmount(UnmountCommand),
}

/// Arguments for the `cfy-mount mount` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct MountCommand {
    /// Mount point on the node.
    #[arg(value_name = "PATH")]
    pub(crate) path: String,
    /// Mount options supplied by the storage host, as a JSON object.
    #[arg(value_name = "OPTIONS_JSON")]
    pub(crate) options: String,
}

/// Arguments for the `cfy-mount unmount` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct UnmountCommand {
    /// Mount point on the node.
    #[arg(value_name = "PATH")]
    pub(crate) path: String,
}
