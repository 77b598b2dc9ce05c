//! Project / dataset / table tree shared by every seed source.

use serde::{Deserialize, Serialize};

use crate::config::ProjectConfig;

/// One row of table data, keyed by column name.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// A declarative seed document: the shape of `--data-from-yaml` files.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Seed {
    #[serde(default)]
    pub projects: Vec<Project>,
}

impl From<Project> for Seed {
    fn from(project: Project) -> Self {
        Self {
            projects: vec![project],
        }
    }
}

/// Top-level data scope.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Project {
    pub id: String,
    #[serde(default)]
    pub datasets: Vec<Dataset>,
}

impl Project {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            datasets: Vec::new(),
        }
    }

    /// Build the startup project from configuration: the project itself and,
    /// when configured, one empty dataset.
    pub fn from_config(config: &ProjectConfig) -> Self {
        let mut project = Self::new(config.id.clone());
        if let Some(dataset) = config.dataset.as_deref().filter(|d| !d.is_empty()) {
            project.datasets.push(Dataset::new(dataset));
        }
        project
    }

    pub fn with_dataset(mut self, dataset: Dataset) -> Self {
        self.datasets.push(dataset);
        self
    }

    pub fn dataset(&self, id: &str) -> Option<&Dataset> {
        self.datasets.iter().find(|d| d.id == id)
    }

    pub fn dataset_ids(&self) -> Vec<&str> {
        self.datasets.iter().map(|d| d.id.as_str()).collect()
    }
}

/// Named grouping inside a project.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Dataset {
    pub id: String,
    #[serde(default)]
    pub tables: Vec<Table>,
}

impl Dataset {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tables: Vec::new(),
        }
    }

    pub fn table(&self, id: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Table {
    pub id: String,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub data: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ColumnType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<ColumnMode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    String,
    Bytes,
    #[serde(alias = "INT64")]
    Integer,
    #[serde(alias = "FLOAT64")]
    Float,
    Numeric,
    Bignumeric,
    #[serde(alias = "BOOL")]
    Boolean,
    Timestamp,
    Date,
    Time,
    Datetime,
    Json,
    #[serde(alias = "STRUCT")]
    Record,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnMode {
    Nullable,
    Required,
    Repeated,
}
