//! Binary entry point for the `cfy-mount` storage plugin.
//!
//! The storage host parses exactly one JSON document from stdout, so every
//! outcome, including argument and configuration errors, is reported as a
//! protocol response and the process exits successfully. Only a failure to
//! write that response yields a non-zero exit status.

use std::env;
use std::io::{self, Write};
use std::process;

use clap::Parser;
use clap::error::ErrorKind as ClapErrorKind;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use cfy_mount::cloudify::{CloudifyClient, CloudifyError};
use cfy_mount::config::{ConfigError, MountConfig};
use cfy_mount::lifecycle::ActionRunner;
use cfy_mount::logging::{LogSink, init_logging};
use cfy_mount::plugin::{MountPlugin, PluginCommand, PluginError, PluginResponse};

mod cli;

use cli::Cli;

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("client error: {0}")]
    Client(#[from] CloudifyError),
    #[error(transparent)]
    Plugin(#[from] PluginError<CloudifyError>),
    #[error("shutdown requested before the operation was submitted")]
    Interrupted,
}

const MISSING_COMMAND_MESSAGE: &str = "missing command: expected one of init, mount, unmount";

#[tokio::main]
async fn main() {
    let sink = init_logging();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        args = ?env::args().collect::<Vec<_>>(),
        "cfy-mount invoked"
    );
    if let LogSink::Stderr { path, error } = &sink {
        warn!(%path, %error, "log file unavailable, logging to stderr");
    }

    let response = match Cli::try_parse() {
        Ok(cli) => respond(into_command(cli)).await,
        Err(err) if is_informational(err.kind()) => err.exit(),
        Err(err) => {
            let message = usage_error_message(&err);
            warn!(%message, "rejected invocation");
            PluginResponse::failure(message)
        }
    };

    if emit(io::stdout(), &response).is_err() {
        process::exit(1);
    }
}

fn into_command(cli: Cli) -> PluginCommand {
    match cli {
        Cli::Init => PluginCommand::Init,
        Cli::Mount(args) => PluginCommand::Mount {
            path: args.path,
            options: args.options,
        },
        Cli::Unmount(args) => PluginCommand::Unmount { path: args.path },
    }
}

const fn is_informational(kind: ClapErrorKind) -> bool {
    matches!(kind, ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion)
}

fn usage_error_message(err: &clap::Error) -> String {
    if err.kind() == ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand {
        return String::from(MISSING_COMMAND_MESSAGE);
    }
    summarise_usage_error(&err.to_string())
}

/// Collapses clap's rendered error into one line, dropping the usage and
/// help hints that follow it.
fn summarise_usage_error(rendered: &str) -> String {
    let joined = rendered
        .lines()
        .map(str::trim)
        .take_while(|line| !line.starts_with("Usage:"))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let message = joined
        .strip_prefix("error: ")
        .unwrap_or(joined.as_str())
        .trim();
    if message.is_empty() {
        String::from("invalid invocation")
    } else {
        message.to_owned()
    }
}

async fn respond(command: PluginCommand) -> PluginResponse {
    match run_command(&command).await {
        Ok(response) => response,
        Err(err) => {
            error!(error = %err, "command failed");
            PluginResponse::failure(err.to_string())
        }
    }
}

async fn run_command(command: &PluginCommand) -> Result<PluginResponse, CliError> {
    if *command == PluginCommand::Init {
        return Ok(PluginResponse::init());
    }

    let cancel = CancellationToken::new();
    let listener = cancel_on_shutdown(cancel.clone());
    let result = match MountConfig::resolve() {
        Ok(config) => execute(command, &config, &cancel).await,
        Err(err) => Err(err.into()),
    };
    listener.abort();
    result
}

async fn execute(
    command: &PluginCommand,
    config: &MountConfig,
    cancel: &CancellationToken,
) -> Result<PluginResponse, CliError> {
    let client = CloudifyClient::new(config.client_settings())?;
    info!(
        host = %config.host,
        tenant = %config.tenant,
        deployment = %config.deployment,
        instance = %config.instance,
        "using Cloudify manager"
    );
    tokio::select! {
        biased;
        () = cancel.cancelled() => {}
        result = client.api_version() => match result {
            Ok(version) => info!(%version, "manager version"),
            Err(err) => warn!(error = %err, "could not read manager version"),
        },
    }
    if cancel.is_cancelled() {
        return Err(CliError::Interrupted);
    }

    let runner = ActionRunner::new(client)
        .with_poll_interval(config.poll_interval())
        .with_wait_timeout(config.wait_timeout());
    let plugin = MountPlugin::new(runner, &config.deployment, &config.instance);

    Ok(plugin.handle(command, cancel).await?)
}

fn cancel_on_shutdown(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if shutdown_signal().await.is_ok() {
            warn!("shutdown requested, cancelling wait");
            cancel.cancel();
        }
    })
}

#[cfg(unix)]
async fn shutdown_signal() -> io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> io::Result<()> {
    tokio::signal::ctrl_c().await
}

fn emit(mut target: impl Write, response: &PluginResponse) -> io::Result<()> {
    let rendered = response.to_json().map_err(io::Error::other)?;
    writeln!(target, "{rendered}")
}
