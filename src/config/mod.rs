//! Configuration loading for the mount plugin.
//!
//! The plugin host invokes the binary without any configuration arguments,
//! so settings come from a JSON file (`CFY_CONFIG`, default
//! `/etc/cloudify/mount.json`). When that file does not exist the layered
//! `ortho-config` loader is used instead, merging defaults, discovered
//! configuration files, and `CFY_*` environment variables.

use std::env;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::cloudify::ClientSettings;

/// Environment variable naming the JSON configuration file.
pub const CONFIG_PATH_ENV: &str = "CFY_CONFIG";
/// Configuration file used when [`CONFIG_PATH_ENV`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/cloudify/mount.json";
/// Tenant used when none is configured.
pub const DEFAULT_TENANT: &str = "default_tenant";
/// Seconds between two execution status checks.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;
/// Seconds to wait for an execution before giving up.
pub const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 3600;

fn default_tenant() -> String {
    DEFAULT_TENANT.to_owned()
}

const fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

const fn default_wait_timeout_secs() -> u64 {
    DEFAULT_WAIT_TIMEOUT_SECS
}

/// Cloudify connection and target settings for the mount plugin.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "CFY",
    discovery(
        app_name = "cfy-mount",
        config_file_name = "mount.json",
        dotfile_name = ".cfy-mount.json",
        project_file_name = "cfy-mount.json"
    )
)]
pub struct MountConfig {
    /// Manager host, optionally with scheme and port.
    pub host: String,
    /// User name for the manager API.
    pub user: String,
    /// Password for the manager API.
    pub password: String,
    /// Tenant the deployment belongs to.
    #[serde(default = "default_tenant")]
    #[ortho_config(default = DEFAULT_TENANT.to_owned())]
    pub tenant: String,
    /// Deployment owning the storage node.
    pub deployment: String,
    /// Node instance the mount operations run on. Older configuration files
    /// spell the key `intance`; both are accepted.
    #[serde(alias = "intance")]
    pub instance: String,
    /// Seconds between two execution status checks.
    #[serde(default = "default_poll_interval_secs")]
    #[ortho_config(default = DEFAULT_POLL_INTERVAL_SECS)]
    pub poll_interval_secs: u64,
    /// Seconds to wait for an execution to finish; `0` waits forever.
    #[serde(default = "default_wait_timeout_secs")]
    #[ortho_config(default = DEFAULT_WAIT_TIMEOUT_SECS)]
    pub wait_timeout_secs: u64,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    json_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, json_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            json_key,
        }
    }
}

impl MountConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: set {} or add \"{}\" to the JSON file named by {CONFIG_PATH_ENV}",
                metadata.description, metadata.env_var, metadata.json_key
            )));
        }
        Ok(())
    }

    /// Returns the configuration file path, honouring [`CONFIG_PATH_ENV`].
    #[must_use]
    pub fn config_path() -> Utf8PathBuf {
        env::var(CONFIG_PATH_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map_or_else(|| Utf8PathBuf::from(DEFAULT_CONFIG_PATH), Utf8PathBuf::from)
    }

    /// Loads and validates the configuration the plugin runs with.
    ///
    /// Reads the JSON file from [`Self::config_path`] when it exists and
    /// falls back to [`Self::load_without_cli_args`] otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when no source can be read or a required
    /// field is missing.
    pub fn resolve() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        let config = if file_exists(&path)? {
            Self::from_json_file(&path)?
        } else {
            Self::load_without_cli_args()?
        };
        config.validate()?;
        Ok(config)
    }

    /// Parses a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read and
    /// [`ConfigError::Parse`] when it is not a valid configuration document.
    pub fn from_json_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        let contents = read_file(path)?;
        Self::from_json_str(&contents)
            .map_err(|err| ConfigError::Parse(format!("{path}: {err}")))
    }

    /// Parses a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the document does not match the
    /// expected shape.
    pub fn from_json_str(contents: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(contents).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// merge defaults, discovered configuration files, and environment
    /// variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("cfy-mount")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation on required fields. Error messages include
    /// guidance on how to provide missing values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is empty
    /// and [`ConfigError::Invalid`] when the poll interval is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(
            &self.host,
            &FieldMetadata::new("Cloudify manager host", "CFY_HOST", "host"),
        )?;
        Self::require_field(
            &self.user,
            &FieldMetadata::new("Cloudify user", "CFY_USER", "user"),
        )?;
        Self::require_field(
            &self.password,
            &FieldMetadata::new("Cloudify password", "CFY_PASSWORD", "password"),
        )?;
        Self::require_field(
            &self.deployment,
            &FieldMetadata::new("target deployment", "CFY_DEPLOYMENT", "deployment"),
        )?;
        Self::require_field(
            &self.instance,
            &FieldMetadata::new("target node instance", "CFY_INSTANCE", "instance"),
        )?;
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(String::from(
                "poll_interval_secs must be greater than zero",
            )));
        }
        Ok(())
    }

    /// Connection settings for the Cloudify client.
    #[must_use]
    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            host: self.host.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            tenant: self.tenant.clone(),
        }
    }

    /// Interval between two status checks.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Upper bound on the wait, `None` when disabled with `0`.
    #[must_use]
    pub const fn wait_timeout(&self) -> Option<Duration> {
        match self.wait_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

fn split_path(path: &Utf8Path) -> Result<(&Utf8Path, &str), ConfigError> {
    let parent = path
        .parent()
        .filter(|dir| !dir.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path.file_name().ok_or_else(|| ConfigError::Io {
        path: path.to_path_buf(),
        message: String::from("path does not name a file"),
    })?;
    Ok((parent, file_name))
}

fn file_exists(path: &Utf8Path) -> Result<bool, ConfigError> {
    let (parent, file_name) = split_path(path)?;
    match Dir::open_ambient_dir(parent, ambient_authority()) {
        Ok(dir) => dir.try_exists(file_name).map_err(|err| ConfigError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(ConfigError::Io {
            path: parent.to_path_buf(),
            message: err.to_string(),
        }),
    }
}

fn read_file(path: &Utf8Path) -> Result<String, ConfigError> {
    let (parent, file_name) = split_path(path)?;
    let dir =
        Dir::open_ambient_dir(parent, ambient_authority()).map_err(|err| ConfigError::Io {
            path: parent.to_path_buf(),
            message: err.to_string(),
        })?;
    dir.read_to_string(file_name).map_err(|err| ConfigError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates a field holds an unusable value.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// Surfaces parse errors from the JSON file or the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
    /// Raised when the configuration file cannot be read.
    #[error("failed to read {path}: {message}")]
    Io {
        /// Path that could not be read.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
