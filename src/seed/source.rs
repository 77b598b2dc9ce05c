//! Seed sources and their application to an engine.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::engine::Engine;
use crate::seed::model::{Project, Seed, Table};
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse seed {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid seed: {0}")]
    Invalid(String),

    #[error("failed to store seed: {0}")]
    Storage(#[from] StorageError),
}

/// A producer of initial data.
///
/// Startup applies a `Structured` source built from configuration first and a
/// `File` source second, so the file can extend what the structured seed created.
#[derive(Debug, Clone, PartialEq)]
pub enum SeedSource {
    /// A project tree built in process.
    Structured(Project),
    /// A YAML document on disk.
    File(PathBuf),
}

impl SeedSource {
    /// Hand this source to the engine. File sources are read, parsed and
    /// validated completely before the engine sees any of it.
    pub fn apply<E: Engine>(&self, engine: &E) -> Result<(), SeedError> {
        let seed = match self {
            SeedSource::Structured(project) => {
                let seed = Seed::from(project.clone());
                validate_seed(&seed)?;
                seed
            }
            SeedSource::File(path) => parse_seed_file(path)?,
        };

        tracing::debug!(
            source = %self.describe(),
            projects = seed.projects.len(),
            "Applying seed"
        );
        engine.load(&seed)
    }

    fn describe(&self) -> String {
        match self {
            SeedSource::Structured(project) => format!("project {}", project.id),
            SeedSource::File(path) => path.display().to_string(),
        }
    }
}

/// Parse and validate a seed file.
pub fn parse_seed_file(path: &Path) -> Result<Seed, SeedError> {
    let content = fs::read_to_string(path).map_err(|source| SeedError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_seed(&content, &path.display().to_string())
}

/// Parse and validate a seed held in memory.
pub fn parse_seed_str(content: &str) -> Result<Seed, SeedError> {
    parse_seed(content, "<inline>")
}

fn parse_seed(content: &str, origin: &str) -> Result<Seed, SeedError> {
    // An empty document is a valid, empty seed.
    if content.trim().is_empty() {
        return Ok(Seed::default());
    }
    let seed: Seed = serde_yaml::from_str(content).map_err(|source| SeedError::Parse {
        origin: origin.to_string(),
        source,
    })?;
    validate_seed(&seed)?;
    Ok(seed)
}

/// Structural checks the engine relies on.
pub fn validate_seed(seed: &Seed) -> Result<(), SeedError> {
    let mut projects = HashSet::new();
    for project in &seed.projects {
        require_id("project", &project.id)?;
        if !projects.insert(project.id.as_str()) {
            return Err(invalid(format!("duplicate project {:?}", project.id)));
        }

        let mut datasets = HashSet::new();
        for dataset in &project.datasets {
            require_id("dataset", &dataset.id)?;
            if !datasets.insert(dataset.id.as_str()) {
                return Err(invalid(format!(
                    "duplicate dataset {:?} in project {:?}",
                    dataset.id, project.id
                )));
            }

            let mut tables = HashSet::new();
            for table in &dataset.tables {
                require_id("table", &table.id)?;
                if !tables.insert(table.id.as_str()) {
                    return Err(invalid(format!(
                        "duplicate table {:?} in dataset {}.{}",
                        table.id, project.id, dataset.id
                    )));
                }
                validate_table(table).map_err(|reason| {
                    invalid(format!(
                        "table {}.{}.{}: {}",
                        project.id, dataset.id, table.id, reason
                    ))
                })?;
            }
        }
    }
    Ok(())
}

fn validate_table(table: &Table) -> Result<(), String> {
    let mut columns = HashSet::new();
    for column in &table.columns {
        if column.name.trim().is_empty() {
            return Err("column with empty name".to_string());
        }
        if !columns.insert(column.name.as_str()) {
            return Err(format!("duplicate column {:?}", column.name));
        }
    }

    for (index, row) in table.data.iter().enumerate() {
        if let Some(key) = row.keys().find(|k| !columns.contains(k.as_str())) {
            return Err(format!("row {} has unknown column {:?}", index, key));
        }
    }
    Ok(())
}

fn require_id(kind: &str, id: &str) -> Result<(), SeedError> {
    if id.trim().is_empty() {
        return Err(invalid(format!("{} with empty id", kind)));
    }
    Ok(())
}

fn invalid(reason: String) -> SeedError {
    SeedError::Invalid(reason)
}
