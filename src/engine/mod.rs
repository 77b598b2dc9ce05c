//! Engine lifecycle facade.
//!
//! # Data Flow
//! ```text
//! StorageHandle → Engine::construct
//!     → load(seed) / set_active_project / set_log_*   (startup, sequential)
//!     → serve(addrs, listening)                       (serve task)
//!     → stop(deadline)                                (signal task)
//! ```
//!
//! The lifecycle coordinator only ever talks to an engine through this trait.
//! `EmulatorEngine` is the implementation the binary ships with.

pub mod emulator;
pub mod rest;
pub mod rpc;

use std::future::Future;

use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::config::{ListenAddrs, LogFormat, LogLevel};
use crate::error::Error;
use crate::lifecycle::{BoundAddrs, ShutdownError};
use crate::net::ListenerError;
use crate::seed::{Seed, SeedError};
use crate::storage::{StorageError, StorageHandle};

pub use emulator::EmulatorEngine;

/// What the lifecycle coordinator needs from a data engine.
pub trait Engine: Send + Sync + Sized + 'static {
    /// Open the engine on `storage`.
    fn construct(storage: StorageHandle) -> Result<Self, StorageError>;

    /// Make `id` the project requests default to.
    ///
    /// An unknown project is a `ConfigError::UnknownProject`; a failed lookup
    /// is reported as the storage error it is.
    fn set_active_project(&self, id: &str) -> Result<(), Error>;

    /// Merge a seed into the engine's data.
    fn load(&self, seed: &Seed) -> Result<(), SeedError>;

    fn set_log_level(&self, level: LogLevel);

    fn set_log_format(&self, format: LogFormat);

    /// Serve both listeners until `stop` is called or a listener fails.
    ///
    /// Sends the bound addresses on `listening` once both listeners are bound.
    /// Returns `Ok(())` when the listeners closed because `stop` asked them to,
    /// and only after both have terminated.
    fn serve(
        &self,
        addrs: ListenAddrs,
        listening: oneshot::Sender<BoundAddrs>,
    ) -> impl Future<Output = Result<(), ListenerError>> + Send;

    /// Ask both listeners to drain, waiting at most until `deadline`.
    fn stop(&self, deadline: Instant) -> impl Future<Output = Result<(), ShutdownError>> + Send;
}
