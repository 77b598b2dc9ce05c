//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate config → Select storage → Construct engine → Seed → Log settings
//!
//! Serving (coordinator.rs):
//!     serve task ──result──▶ completion channel ──▶ exit status
//!     signal task ──SIGTERM/SIGINT──▶ Engine::stop ──error──▶ log
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → graceful drain with a deadline
//! ```
//!
//! # Design Decisions
//! - Ordered startup: nothing listens until every seed is applied
//! - The serve result alone decides the exit status
//! - Shutdown has a deadline: listeners are force-closed after it

pub mod coordinator;
pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod state;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

pub use coordinator::{Coordinator, ShutdownReport};
pub use shutdown::{Shutdown, ShutdownError};
pub use signals::{Signal, Signals};
pub use startup::bootstrap;
pub use state::{BoundAddrs, LifecycleState, Status};

use crate::config::{ConfigError, EmulatorConfig, ValidationError};
use crate::engine::EmulatorEngine;
use crate::error::Error;
use crate::observability::metrics;

/// Run the emulator until SIGINT or SIGTERM.
pub async fn run(config: &EmulatorConfig) -> Result<ShutdownReport, Error> {
    let signals = Signals::install().map_err(Error::Signals)?;
    run_until(config, signals.recv()).await
}

/// Run the emulator until `signal` resolves.
pub async fn run_until<S>(config: &EmulatorConfig, signal: S) -> Result<ShutdownReport, Error>
where
    S: Future<Output = Signal> + Send + 'static,
{
    let engine = bootstrap::<EmulatorEngine>(config)?
        .with_request_timeout(config.listener.request_timeout());

    if let Some(addr) = &config.observability.metrics_address {
        let addr: SocketAddr = addr.parse().map_err(|_| {
            ConfigError::Validation(vec![ValidationError::InvalidMetricsAddress(addr.clone())])
        })?;
        metrics::init_metrics(addr)?;
    }

    let coordinator = Coordinator::new(Arc::new(engine), config.lifecycle.shutdown_timeout());
    coordinator.run(config.listener.addrs(), signal).await
}
