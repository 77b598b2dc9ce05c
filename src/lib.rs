//! Warehouse Emulator Library
//!
//! Bootstraps a local data engine, seeds it, serves it over a REST and an RPC
//! listener, and drains both on SIGINT/SIGTERM.

pub mod config;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod seed;
pub mod storage;

pub use config::EmulatorConfig;
pub use engine::{EmulatorEngine, Engine};
pub use error::Error;
pub use lifecycle::{Coordinator, ShutdownReport};
