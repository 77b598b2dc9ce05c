//! Command line and environment options.

use std::path::PathBuf;

use clap::Parser;

use crate::config::schema::{LogFormat, LogLevel};

/// Every option is optional here; defaults live in the schema so a TOML file
/// can sit between them and the flags.
#[derive(Debug, Default, Parser)]
#[command(name = "warehouse-emulator")]
#[command(about = "Local data warehouse emulator serving a REST and an RPC API", long_about = None)]
pub struct Cli {
    /// Specify the project name
    #[arg(long, env = "PROJECT")]
    pub project: Option<String>,

    /// Specify the dataset name
    #[arg(long, env = "DATASET")]
    pub dataset: Option<String>,

    /// Specify the host [default: 0.0.0.0]
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Specify the http port number used by the REST API [default: 9050]
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Specify the port number used by the RPC API [default: 9060]
    #[arg(long = "grpc-port", env = "GRPC_PORT")]
    pub grpc_port: Option<u16>,

    /// Specify the log level [default: error]
    #[arg(long, value_enum, env = "LOG_LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Specify the log format [default: console]
    #[arg(long, value_enum, env = "LOG_FORMAT")]
    pub log_format: Option<LogFormat>,

    /// Specify the database file if required. If not specified, it will be in memory
    #[arg(long, env = "DATABASE")]
    pub database: Option<PathBuf>,

    /// Specify the path to the YAML file that contains the initial data
    #[arg(long = "data-from-yaml", env = "DATA_FROM_YAML")]
    pub data_from_yaml: Option<PathBuf>,

    /// Seconds to wait for listeners to drain on shutdown [default: 30]
    #[arg(long = "shutdown-timeout", env = "SHUTDOWN_TIMEOUT")]
    pub shutdown_timeout: Option<u64>,

    /// Expose Prometheus metrics on this address
    #[arg(long = "metrics-address", env = "METRICS_ADDRESS")]
    pub metrics_address: Option<String>,

    /// Read base settings from a TOML file
    #[arg(long, env = "EMULATOR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print version
    #[arg(short = 'v', long)]
    pub version: bool,
}
