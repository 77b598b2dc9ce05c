//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Select storage and construct the engine
//! - Apply seeds in order: configured project first, then the optional file
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Steps run in order, not concurrently
//! - Listeners start later, so a partially seeded engine is never reachable

use crate::config::{validate_config, ConfigError, EmulatorConfig};
use crate::engine::Engine;
use crate::error::Error;
use crate::seed::{Project, SeedSource};
use crate::storage::StorageHandle;

/// Build a ready-to-serve engine from configuration.
pub fn bootstrap<E: Engine>(config: &EmulatorConfig) -> Result<E, Error> {
    validate_config(config).map_err(ConfigError::Validation)?;

    let storage = StorageHandle::select(config.storage.database.as_deref());
    tracing::debug!(storage = %storage, "Storage selected");
    let engine = E::construct(storage)?;

    let project = Project::from_config(&config.project);
    SeedSource::Structured(project).apply(&engine)?;
    engine.set_active_project(&config.project.id)?;

    engine.set_log_level(config.observability.log_level);
    engine.set_log_format(config.observability.log_format);

    if let Some(path) = &config.storage.data_from_yaml {
        SeedSource::File(path.clone()).apply(&engine)?;
    }

    tracing::debug!(project = %config.project.id, "Engine ready");
    Ok(engine)
}
