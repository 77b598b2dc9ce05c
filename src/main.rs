//! Warehouse Emulator
//!
//! A local stand-in for a data warehouse service, built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!   flags / env / TOML ──▶ config ──▶ lifecycle::startup
//!                                        │
//!                                        ├─ storage (memory or shared-cache file)
//!                                        ├─ engine::construct
//!                                        └─ seed: project from config, then YAML file
//!                                        │
//!                                        ▼
//!                               lifecycle::coordinator
//!                         ┌──────────────┴──────────────┐
//!                    serve task                     signal task
//!              REST :9050   RPC :9060            SIGINT / SIGTERM
//!                         │                             │
//!                         └──── result ──▶ exit ◀── stop(deadline)
//! ```

use std::process::ExitCode;

use clap::Parser;

use warehouse_emulator::config::{loader, Cli};
use warehouse_emulator::lifecycle;
use warehouse_emulator::observability::logging::{self, LIFECYCLE_TARGET};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // Help output goes to stdout and is not an error.
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    if cli.version {
        println!(
            "version: {} ({})",
            env!("CARGO_PKG_VERSION"),
            option_env!("GIT_REVISION").unwrap_or("unknown")
        );
        return ExitCode::SUCCESS;
    }

    let config = match loader::resolve(cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("[warehouse-emulator] {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(
        config.observability.log_level,
        config.observability.log_format,
    ) {
        eprintln!("[warehouse-emulator] failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    match lifecycle::run(&config).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(target: LIFECYCLE_TARGET, error = %e, "Emulator failed");
            ExitCode::FAILURE
        }
    }
}
