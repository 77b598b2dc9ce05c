//! Storage selection.
//!
//! # Responsibilities
//! - Map the configured database path (or its absence) to a storage handle
//! - Open logical connections that all observe one shared state
//!
//! # Design Decisions
//! - Selection is pure; failures to open surface when the engine connects
//! - Every handle uses SQLite shared-cache URIs, including the in-memory one,
//!   so every connection opened from a handle sees the same database
//! - In-memory handles get a unique name so two engines in one process never alias

pub mod catalog;

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, OpenFlags};
use thiserror::Error;
use uuid::Uuid;

pub use catalog::Catalog;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to open storage {uri}: {source}")]
    Open {
        uri: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to prepare storage schema: {0}")]
    Migrate(#[source] rusqlite::Error),

    #[error("storage query failed: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("failed to encode stored value: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("storage connection lock poisoned")]
    Poisoned,
}

/// Where the engine keeps its data. Chosen once, before the engine exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageHandle {
    /// Process-lifetime store, gone when the last connection closes.
    Ephemeral { name: String },
    /// Database file opened in shared-cache mode.
    SharedFile { path: PathBuf },
}

impl StorageHandle {
    /// Pick the storage for an optional database path. Empty paths mean in-memory.
    pub fn select(path: Option<&Path>) -> Self {
        match path.filter(|p| !p.as_os_str().is_empty()) {
            Some(path) => StorageHandle::SharedFile {
                path: path.to_path_buf(),
            },
            None => Self::ephemeral(),
        }
    }

    /// A fresh in-memory store.
    pub fn ephemeral() -> Self {
        StorageHandle::Ephemeral {
            name: format!("emulator-{}", Uuid::new_v4().simple()),
        }
    }

    pub fn is_ephemeral(&self) -> bool {
        matches!(self, StorageHandle::Ephemeral { .. })
    }

    /// SQLite URI encoding this handle.
    pub fn uri(&self) -> String {
        match self {
            StorageHandle::Ephemeral { name } => {
                format!("file:{}?mode=memory&cache=shared", name)
            }
            StorageHandle::SharedFile { path } => {
                format!("file:{}?cache=shared", escape_uri_path(path))
            }
        }
    }

    /// Open a new logical connection to this store.
    pub fn connect(&self) -> Result<Connection, StorageError> {
        let uri = self.uri();
        let conn = Connection::open_with_flags(&uri, OpenFlags::default())
            .map_err(|source| StorageError::Open { uri, source })?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(conn)
    }
}

impl fmt::Display for StorageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageHandle::Ephemeral { name } => write!(f, "memory ({})", name),
            StorageHandle::SharedFile { path } => write!(f, "file {}", path.display()),
        }
    }
}

fn escape_uri_path(path: &Path) -> String {
    let raw = path.to_string_lossy();
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '%' => escaped.push_str("%25"),
            '?' => escaped.push_str("%3f"),
            '#' => escaped.push_str("%23"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_without_path_is_ephemeral() {
        assert!(StorageHandle::select(None).is_ephemeral());
        assert!(StorageHandle::select(Some(Path::new(""))).is_ephemeral());
    }

    #[test]
    fn test_ephemeral_handles_do_not_alias() {
        assert_ne!(StorageHandle::ephemeral(), StorageHandle::ephemeral());
    }

    #[test]
    fn test_file_handle_uses_shared_cache() {
        let handle = StorageHandle::select(Some(Path::new("/tmp/emulator.db")));
        assert_eq!(handle.uri(), "file:/tmp/emulator.db?cache=shared");
    }

    #[test]
    fn test_ephemeral_uri() {
        let handle = StorageHandle::Ephemeral {
            name: "x".into(),
        };
        assert_eq!(handle.uri(), "file:x?mode=memory&cache=shared");
    }

    #[test]
    fn test_uri_escapes_reserved_characters() {
        let handle = StorageHandle::select(Some(Path::new("/tmp/a?b#c%d.db")));
        assert_eq!(handle.uri(), "file:/tmp/a%3fb%23c%25d.db?cache=shared");
    }

    #[test]
    fn test_connections_share_ephemeral_state() {
        let handle = StorageHandle::ephemeral();
        let first = handle.connect().unwrap();
        first
            .execute_batch("CREATE TABLE t (v INTEGER); INSERT INTO t VALUES (7);")
            .unwrap();

        let second = handle.connect().unwrap();
        let v: i64 = second.query_row("SELECT v FROM t", [], |r| r.get(0)).unwrap();
        assert_eq!(v, 7);
    }

    #[test]
    fn test_unopenable_path() {
        let handle = StorageHandle::select(Some(Path::new("/nonexistent-dir/sub/db.sqlite")));
        assert!(matches!(handle.connect(), Err(StorageError::Open { .. })));
    }
}
