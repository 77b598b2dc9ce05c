//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (schema.rs)
//!     → optional TOML file (loader.rs)
//!     → environment + flags (cli.rs, merged by loader.rs)
//!     → validation.rs (semantic checks, run by startup)
//!     → EmulatorConfig (immutable for the life of the process)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults so the project id is the only required input
//! - Validation separates syntactic (serde/clap) from semantic checks

pub mod cli;
pub mod loader;
pub mod schema;
pub mod validation;

pub use cli::Cli;
pub use loader::ConfigError;
pub use schema::{
    EmulatorConfig, LifecycleConfig, ListenAddrs, ListenerConfig, LogFormat, LogLevel,
    ObservabilityConfig, ProjectConfig, StorageConfig,
};
pub use validation::{validate_config, ValidationError};
