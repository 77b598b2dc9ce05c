//! Configuration loading from disk and the command line.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::cli::Cli;
use crate::config::schema::EmulatorConfig;
use crate::config::validation::ValidationError;

/// Error type for configuration problems.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {}", join(.0))]
    Validation(Vec<ValidationError>),

    #[error("project {0:?} does not exist")]
    UnknownProject(String),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<Vec<ValidationError>> for ConfigError {
    fn from(errors: Vec<ValidationError>) -> Self {
        ConfigError::Validation(errors)
    }
}

/// Load configuration from a TOML file.
///
/// The result is not validated: a file may leave the project to the command line.
pub fn load_config(path: &Path) -> Result<EmulatorConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Merge defaults, the optional TOML file, and command line/environment options.
pub fn resolve(cli: Cli) -> Result<EmulatorConfig, ConfigError> {
    let base = match &cli.config {
        Some(path) => load_config(path)?,
        None => EmulatorConfig::default(),
    };
    Ok(overlay(base, cli))
}

/// Apply every option that was actually given on top of `config`.
/// Empty strings count as not given.
pub fn overlay(mut config: EmulatorConfig, cli: Cli) -> EmulatorConfig {
    if let Some(project) = non_empty(cli.project) {
        config.project.id = project;
    }
    if let Some(dataset) = non_empty(cli.dataset) {
        config.project.dataset = Some(dataset);
    }
    if let Some(host) = non_empty(cli.host) {
        config.listener.host = host;
    }
    if let Some(port) = cli.port {
        config.listener.http_port = port;
    }
    if let Some(port) = cli.grpc_port {
        config.listener.grpc_port = port;
    }
    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.observability.log_format = format;
    }
    if let Some(database) = non_empty_path(cli.database) {
        config.storage.database = Some(database);
    }
    if let Some(path) = non_empty_path(cli.data_from_yaml) {
        config.storage.data_from_yaml = Some(path);
    }
    if let Some(secs) = cli.shutdown_timeout {
        config.lifecycle.shutdown_timeout_secs = secs;
    }
    if let Some(addr) = non_empty(cli.metrics_address) {
        config.observability.metrics_address = Some(addr);
    }
    config
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn non_empty_path(value: Option<PathBuf>) -> Option<PathBuf> {
    value.filter(|p| !p.as_os_str().is_empty())
}
