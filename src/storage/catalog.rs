//! SQLite-backed catalog of projects, datasets and tables.

use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use crate::seed::{Column, Dataset, Project, Row, Seed, Table};
use crate::storage::{StorageError, StorageHandle};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY NOT NULL
);
CREATE TABLE IF NOT EXISTS datasets (
    project_id TEXT NOT NULL,
    id TEXT NOT NULL,
    PRIMARY KEY (project_id, id)
);
CREATE TABLE IF NOT EXISTS tables (
    project_id TEXT NOT NULL,
    dataset_id TEXT NOT NULL,
    id TEXT NOT NULL,
    columns TEXT NOT NULL,
    PRIMARY KEY (project_id, dataset_id, id)
);
CREATE TABLE IF NOT EXISTS table_rows (
    project_id TEXT NOT NULL,
    dataset_id TEXT NOT NULL,
    table_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    row TEXT NOT NULL,
    PRIMARY KEY (project_id, dataset_id, table_id, position)
);
";

/// The engine's view of its storage handle.
///
/// Keeps one connection open for the life of the catalog, which also keeps an
/// in-memory store alive.
pub struct Catalog {
    handle: StorageHandle,
    conn: Mutex<Connection>,
}

impl Catalog {
    /// Connect to `handle` and make sure the schema exists.
    pub fn open(handle: StorageHandle) -> Result<Self, StorageError> {
        let conn = handle.connect()?;
        conn.execute_batch(SCHEMA).map_err(StorageError::Migrate)?;

        tracing::debug!(storage = %handle, "Catalog opened");
        Ok(Self {
            handle,
            conn: Mutex::new(conn),
        })
    }

    pub fn handle(&self) -> &StorageHandle {
        &self.handle
    }

    /// Merge a seed into the catalog in a single transaction.
    ///
    /// Projects and datasets are added when missing and never removed. Tables
    /// named by the seed replace their stored definition and rows.
    pub fn apply_seed(&self, seed: &Seed) -> Result<(), StorageError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        for project in &seed.projects {
            tx.execute(
                "INSERT OR IGNORE INTO projects (id) VALUES (?1)",
                params![project.id],
            )?;
            for dataset in &project.datasets {
                tx.execute(
                    "INSERT OR IGNORE INTO datasets (project_id, id) VALUES (?1, ?2)",
                    params![project.id, dataset.id],
                )?;
                for table in &dataset.tables {
                    store_table(&tx, &project.id, &dataset.id, table)?;
                }
            }
        }

        tx.commit()?;
        Ok(())
    }

    pub fn has_project(&self, id: &str) -> Result<bool, StorageError> {
        let conn = self.lock()?;
        project_exists(&conn, id)
    }

    /// Project ids in creation order.
    pub fn project_ids(&self) -> Result<Vec<String>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id FROM projects ORDER BY rowid")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    /// Dataset ids of a project in creation order; `None` for unknown projects.
    pub fn dataset_ids(&self, project: &str) -> Result<Option<Vec<String>>, StorageError> {
        let conn = self.lock()?;
        if !project_exists(&conn, project)? {
            return Ok(None);
        }
        Ok(Some(dataset_ids(&conn, project)?))
    }

    /// The full tree of a project, rows included.
    pub fn project(&self, id: &str) -> Result<Option<Project>, StorageError> {
        let conn = self.lock()?;
        if !project_exists(&conn, id)? {
            return Ok(None);
        }

        let mut project = Project::new(id);
        for dataset_id in dataset_ids(&conn, id)? {
            let mut dataset = Dataset::new(dataset_id);
            dataset.tables = table_defs(&conn, id, &dataset.id)?;
            for table in &mut dataset.tables {
                table.data = rows(&conn, id, &dataset.id, &table.id)?;
            }
            project.datasets.push(dataset);
        }
        Ok(Some(project))
    }

    /// A dataset with its table definitions. Rows are left empty.
    pub fn dataset(&self, project: &str, id: &str) -> Result<Option<Dataset>, StorageError> {
        let conn = self.lock()?;
        let exists = conn
            .query_row(
                "SELECT 1 FROM datasets WHERE project_id = ?1 AND id = ?2",
                params![project, id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if !exists {
            return Ok(None);
        }

        let mut dataset = Dataset::new(id);
        dataset.tables = table_defs(&conn, project, id)?;
        Ok(Some(dataset))
    }

    /// Stored rows of a table in seed order; `None` for unknown tables.
    pub fn table_rows(
        &self,
        project: &str,
        dataset: &str,
        table: &str,
    ) -> Result<Option<Vec<Row>>, StorageError> {
        let conn = self.lock()?;
        let exists = conn
            .query_row(
                "SELECT 1 FROM tables WHERE project_id = ?1 AND dataset_id = ?2 AND id = ?3",
                params![project, dataset, table],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if !exists {
            return Ok(None);
        }
        Ok(Some(rows(&conn, project, dataset, table)?))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }
}

fn store_table(
    conn: &Connection,
    project: &str,
    dataset: &str,
    table: &Table,
) -> Result<(), StorageError> {
    let columns = serde_json::to_string(&table.columns)?;
    conn.execute(
        "INSERT INTO tables (project_id, dataset_id, id, columns) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (project_id, dataset_id, id) DO UPDATE SET columns = excluded.columns",
        params![project, dataset, table.id, columns],
    )?;
    conn.execute(
        "DELETE FROM table_rows WHERE project_id = ?1 AND dataset_id = ?2 AND table_id = ?3",
        params![project, dataset, table.id],
    )?;

    let mut insert = conn.prepare(
        "INSERT INTO table_rows (project_id, dataset_id, table_id, position, row)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for (position, row) in table.data.iter().enumerate() {
        let encoded = serde_json::to_string(row)?;
        insert.execute(params![project, dataset, table.id, position as i64, encoded])?;
    }
    Ok(())
}

fn project_exists(conn: &Connection, id: &str) -> Result<bool, StorageError> {
    let found = conn
        .query_row("SELECT 1 FROM projects WHERE id = ?1", params![id], |_| {
            Ok(())
        })
        .optional()?;
    Ok(found.is_some())
}

fn dataset_ids(conn: &Connection, project: &str) -> Result<Vec<String>, StorageError> {
    let mut stmt = conn.prepare("SELECT id FROM datasets WHERE project_id = ?1 ORDER BY rowid")?;
    let ids = stmt
        .query_map(params![project], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(ids)
}

fn table_defs(conn: &Connection, project: &str, dataset: &str) -> Result<Vec<Table>, StorageError> {
    let mut stmt = conn.prepare(
        "SELECT id, columns FROM tables WHERE project_id = ?1 AND dataset_id = ?2 ORDER BY rowid",
    )?;
    let stored = stmt
        .query_map(params![project, dataset], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut tables = Vec::with_capacity(stored.len());
    for (id, columns) in stored {
        let columns: Vec<Column> = serde_json::from_str(&columns)?;
        tables.push(Table {
            id,
            columns,
            data: Vec::new(),
        });
    }
    Ok(tables)
}

fn rows(
    conn: &Connection,
    project: &str,
    dataset: &str,
    table: &str,
) -> Result<Vec<Row>, StorageError> {
    let mut stmt = conn.prepare(
        "SELECT row FROM table_rows
         WHERE project_id = ?1 AND dataset_id = ?2 AND table_id = ?3
         ORDER BY position",
    )?;
    let encoded = stmt
        .query_map(params![project, dataset, table], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    encoded
        .iter()
        .map(|raw| serde_json::from_str(raw).map_err(StorageError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::parse_seed_str;

    fn catalog() -> Catalog {
        Catalog::open(StorageHandle::ephemeral()).unwrap()
    }

    #[test]
    fn test_apply_and_read_back() {
        let catalog = catalog();
        catalog
            .apply_seed(&Seed::from(
                Project::new("proj1").with_dataset(Dataset::new("ds1")),
            ))
            .unwrap();

        assert!(catalog.has_project("proj1").unwrap());
        assert!(!catalog.has_project("other").unwrap());
        assert_eq!(catalog.project_ids().unwrap(), vec!["proj1"]);
        assert_eq!(
            catalog.dataset_ids("proj1").unwrap(),
            Some(vec!["ds1".to_string()])
        );
        assert_eq!(catalog.dataset_ids("other").unwrap(), None);
    }

    #[test]
    fn test_later_seed_extends_earlier() {
        let catalog = catalog();
        catalog
            .apply_seed(&Seed::from(
                Project::new("proj1").with_dataset(Dataset::new("ds1")),
            ))
            .unwrap();
        catalog
            .apply_seed(&Seed::from(
                Project::new("proj1").with_dataset(Dataset::new("ds2")),
            ))
            .unwrap();

        assert_eq!(
            catalog.dataset_ids("proj1").unwrap(),
            Some(vec!["ds1".to_string(), "ds2".to_string()])
        );
    }

    #[test]
    fn test_table_replaced_by_later_seed() {
        let catalog = catalog();
        let first = parse_seed_str(
            "projects:\n  - id: p\n    datasets:\n      - id: d\n        tables:\n          - id: t\n            columns: [{ name: a, type: STRING }]\n            data: [{ a: one }, { a: two }]\n",
        )
        .unwrap();
        let second = parse_seed_str(
            "projects:\n  - id: p\n    datasets:\n      - id: d\n        tables:\n          - id: t\n            columns: [{ name: a, type: STRING }]\n            data: [{ a: three }]\n",
        )
        .unwrap();

        catalog.apply_seed(&first).unwrap();
        catalog.apply_seed(&second).unwrap();

        let rows = catalog.table_rows("p", "d", "t").unwrap().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["a"], "three");
        assert_eq!(catalog.table_rows("p", "d", "missing").unwrap(), None);
    }

    #[test]
    fn test_dataset_lists_tables_without_rows() {
        let catalog = catalog();
        let seed = parse_seed_str(
            "projects:\n  - id: p\n    datasets:\n      - id: d\n        tables:\n          - id: t\n            columns: [{ name: a, type: INT64 }]\n            data: [{ a: 1 }]\n",
        )
        .unwrap();
        catalog.apply_seed(&seed).unwrap();

        let dataset = catalog.dataset("p", "d").unwrap().unwrap();
        assert_eq!(dataset.tables.len(), 1);
        assert!(dataset.tables[0].data.is_empty());
        assert!(catalog.dataset("p", "nope").unwrap().is_none());

        let project = catalog.project("p").unwrap().unwrap();
        assert_eq!(project.datasets[0].tables[0].data.len(), 1);
    }
}
