//! OS signal handling.
//!
//! # Responsibilities
//! - Register SIGINT and SIGTERM handlers during startup
//! - Resolve to the first termination signal received
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Handlers are installed before any listener starts, so a failed
//!   registration is a startup error rather than an unkillable server
//! - Only the first signal is acted on; repeats are not handled specially

use std::fmt;
use std::io;

/// A termination signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Interrupt,
    Terminate,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Interrupt => f.write_str("interrupt"),
            Signal::Terminate => f.write_str("terminated"),
        }
    }
}

/// Registered termination handlers.
pub struct Signals {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl Signals {
    /// Register handlers for interrupt and terminate.
    #[cfg(unix)]
    pub fn install() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(not(unix))]
    pub fn install() -> io::Result<Self> {
        Ok(Self {})
    }

    /// Wait for the first termination signal.
    #[cfg(unix)]
    pub async fn recv(mut self) -> Signal {
        tokio::select! {
            _ = self.interrupt.recv() => Signal::Interrupt,
            _ = self.terminate.recv() => Signal::Terminate,
        }
    }

    #[cfg(not(unix))]
    pub async fn recv(self) -> Signal {
        match tokio::signal::ctrl_c().await {
            Ok(()) => Signal::Interrupt,
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
                std::future::pending().await
            }
        }
    }
}
