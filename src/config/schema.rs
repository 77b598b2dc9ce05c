//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the emulator.
//! All types derive Serde traits for deserialization from config files.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Root configuration for the emulator.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct EmulatorConfig {
    /// Project (tenant) created at startup.
    pub project: ProjectConfig,

    /// Listener configuration for the REST and RPC surfaces.
    pub listener: ListenerConfig,

    /// Storage backend and seed data.
    pub storage: StorageConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// Shutdown behaviour.
    pub lifecycle: LifecycleConfig,
}

/// Project created before the listeners start.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ProjectConfig {
    /// Project identifier. Required.
    pub id: String,

    /// Optional dataset created inside the project.
    pub dataset: Option<String>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Host both listeners bind to.
    pub host: String,

    /// Port of the REST listener.
    pub http_port: u16,

    /// Port of the RPC listener.
    pub grpc_port: u16,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            http_port: 9050,
            grpc_port: 9060,
            request_timeout_secs: 30,
        }
    }
}

impl ListenerConfig {
    /// Addresses the two listeners should bind.
    pub fn addrs(&self) -> ListenAddrs {
        ListenAddrs {
            http: format!("{}:{}", self.host, self.http_port),
            grpc: format!("{}:{}", self.host, self.grpc_port),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Unresolved `host:port` pairs for both listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenAddrs {
    pub http: String,
    pub grpc: String,
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file. In-memory when absent.
    pub database: Option<PathBuf>,

    /// YAML file applied after the project seed.
    pub data_from_yaml: Option<PathBuf>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: LogLevel,

    pub log_format: LogFormat,

    /// Prometheus exporter bind address. Disabled when absent.
    pub metrics_address: Option<String>,
}

/// Lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Deadline for draining both listeners after a termination signal.
    pub shutdown_timeout_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout_secs: 30,
        }
    }
}

impl LifecycleConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Engine log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    #[default]
    Error,
}

impl LogLevel {
    /// Directive understood by `EnvFilter`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_directive())
    }
}

/// Engine log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Console,
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Console => f.write_str("console"),
            LogFormat::Json => f.write_str("json"),
        }
    }
}
