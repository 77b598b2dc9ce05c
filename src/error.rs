//! Crate-level error: everything that makes the process exit with status 1.

use metrics_exporter_prometheus::BuildError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::net::ListenerError;
use crate::seed::SeedError;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Seed(#[from] SeedError),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("failed to install signal handlers: {0}")]
    Signals(#[source] std::io::Error),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] BuildError),

    #[error("serve task ended without reporting a result")]
    ServeTaskLost,
}
