//! SQLite storage engine
//!
//! The connection is opened lazily by [`Backend::open`] so that a store can
//! be constructed before the data directory is known to be writable; an open
//! failure then surfaces through the durable store's fail-fast path.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{params, Connection};

use crate::storage::durable::{Backend, Partition, StoredRecord};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::schema::{init_schema, needs_init};

enum Location {
    File(PathBuf),
    Memory,
}

/// SQLite-backed [`Backend`]
pub struct SqliteBackend {
    location: Location,
    conn: Mutex<Option<Connection>>,
}

impl SqliteBackend {
    /// Engine backed by a database file (created on open)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            location: Location::File(path.into()),
            conn: Mutex::new(None),
        }
    }

    /// Engine backed by a private in-memory database
    pub fn in_memory() -> Self {
        Self {
            location: Location::Memory,
            conn: Mutex::new(None),
        }
    }

    fn connect(&self) -> StorageResult<Connection> {
        let conn = match &self.location {
            Location::File(path) => {
                ensure_parent_dir(path)?;
                Connection::open(path)?
            }
            Location::Memory => Connection::open_in_memory()?,
        };

        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        if needs_init(&conn) {
            init_schema(&conn)?;
        }
        Ok(conn)
    }

    fn lock(&self) -> MutexGuard<'_, Option<Connection>> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Backend for SqliteBackend {
    fn open(&self, partitions: &[Partition]) -> StorageResult<()> {
        let mut guard = self.lock();
        if guard.is_none() {
            *guard = Some(self.connect()?);
        }
        let conn = guard.as_ref().ok_or_else(not_open)?;

        for partition in partitions {
            conn.execute(
                "INSERT OR IGNORE INTO partitions (name) VALUES (?1)",
                params![partition.name()],
            )?;
        }
        Ok(())
    }

    fn replace_all(&self, partition: Partition, records: &[StoredRecord]) -> StorageResult<()> {
        let mut guard = self.lock();
        let conn = guard.as_mut().ok_or_else(not_open)?;
        let name = partition.name();

        let tx = conn
            .transaction()
            .map_err(|e| StorageError::from_sqlite(e, name))?;
        tx.execute("DELETE FROM shelves WHERE partition = ?1", params![name])
            .map_err(|e| StorageError::from_sqlite(e, name))?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO shelves (partition, id, position, payload) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (position, record) in records.iter().enumerate() {
                stmt.execute(params![name, record.id, position as i64, record.payload])
                    .map_err(|e| StorageError::from_sqlite(e, name))?;
            }
        }
        tx.commit().map_err(|e| StorageError::from_sqlite(e, name))?;
        Ok(())
    }

    fn load_all(&self, partition: Partition) -> StorageResult<Vec<StoredRecord>> {
        let guard = self.lock();
        let conn = guard.as_ref().ok_or_else(not_open)?;

        let mut stmt =
            conn.prepare("SELECT id, payload FROM shelves WHERE partition = ?1 ORDER BY position")?;
        let rows = stmt.query_map(params![partition.name()], |row| {
            Ok(StoredRecord {
                id: row.get(0)?,
                payload: row.get(1)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}

fn ensure_parent_dir(path: &Path) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    Ok(())
}

fn not_open() -> StorageError {
    StorageError::Unavailable {
        reason: "database connection is not open".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(id: i64, title: &str) -> StoredRecord {
        StoredRecord {
            id,
            payload: format!(r#"{{"id":{},"title":"{}","items":[]}}"#, id, title),
        }
    }

    #[test]
    fn test_load_follows_write_order_not_key_order() {
        let backend = SqliteBackend::in_memory();
        backend.open(&Partition::ALL).unwrap();

        let records = vec![record(30, "c"), record(10, "a"), record(20, "b")];
        backend.replace_all(Partition::MEDIA, &records).unwrap();

        assert_eq!(backend.load_all(Partition::MEDIA).unwrap(), records);
    }

    #[test]
    fn test_replace_all_is_a_full_replacement() {
        let backend = SqliteBackend::in_memory();
        backend.open(&Partition::ALL).unwrap();

        backend
            .replace_all(Partition::INGREDIENTS, &[record(1, "a"), record(2, "b")])
            .unwrap();
        backend
            .replace_all(Partition::INGREDIENTS, &[record(3, "c")])
            .unwrap();

        let loaded = backend.load_all(Partition::INGREDIENTS).unwrap();
        assert_eq!(loaded, vec![record(3, "c")]);
        assert!(backend.load_all(Partition::MEDIA).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_ids_overwrite() {
        let backend = SqliteBackend::in_memory();
        backend.open(&Partition::ALL).unwrap();

        backend
            .replace_all(Partition::MEDIA, &[record(1, "first"), record(1, "second")])
            .unwrap();

        let loaded = backend.load_all(Partition::MEDIA).unwrap();
        assert_eq!(loaded, vec![record(1, "second")]);
    }

    #[test]
    fn test_calls_before_open_fail() {
        let backend = SqliteBackend::in_memory();
        assert!(matches!(
            backend.load_all(Partition::MEDIA),
            Err(StorageError::Unavailable { .. })
        ));
    }

    #[test]
    fn test_file_database_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("palace.db");

        {
            let backend = SqliteBackend::new(&path);
            backend.open(&Partition::ALL).unwrap();
            backend.open(&Partition::ALL).unwrap();
            backend
                .replace_all(Partition::MEDIA, &[record(5, "kept")])
                .unwrap();
        }

        let backend = SqliteBackend::new(&path);
        backend.open(&Partition::ALL).unwrap();
        assert_eq!(backend.load_all(Partition::MEDIA).unwrap(), vec![record(5, "kept")]);
    }
}
