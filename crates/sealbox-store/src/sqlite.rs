//! SQLite implementation of both collaborator traits.
//!
//! One database file holds the blob records and the key directory. Calls
//! are synchronous and serialized through a mutex on the connection.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};

use sealbox_core::BlobId;

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{BlobStore, KeyDirectory, KeyRole};

/// SQLite-backed blob store and key directory.
///
/// Cloning shares the underlying connection, so a single database can be
/// handed to a vault as both its store and its directory.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        f(&conn)
    }

    /// Number of blob records.
    pub fn blob_count(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM blobs", [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }
}

impl BlobStore for SqliteStore {
    fn put(&self, id: &BlobId, data: &[u8]) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO blobs (id, data) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET data = excluded.data",
                params![id.as_bytes().as_slice(), data],
            )?;
            Ok(())
        })
    }

    fn get(&self, id: &BlobId) -> Result<Option<Vec<u8>>> {
        self.with_conn(|conn| {
            let data = conn
                .query_row(
                    "SELECT data FROM blobs WHERE id = ?1",
                    params![id.as_bytes().as_slice()],
                    |row| row.get::<_, Vec<u8>>(0),
                )
                .optional()?;
            Ok(data)
        })
    }

    fn delete(&self, id: &BlobId) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM blobs WHERE id = ?1",
                params![id.as_bytes().as_slice()],
            )?;
            Ok(())
        })
    }

    fn contains(&self, id: &BlobId) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM blobs WHERE id = ?1",
                    params![id.as_bytes().as_slice()],
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }
}

impl KeyDirectory for SqliteStore {
    fn publish(&self, name: &str, role: KeyRole, key: [u8; 32]) -> Result<()> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO directory (name, role, key, published_at)
                 VALUES (?1, ?2, ?3, strftime('%s','now') * 1000)",
                params![name, role.to_u8(), key.as_slice()],
            )?;
            if inserted == 0 {
                return Err(StoreError::AlreadyPublished {
                    name: name.to_string(),
                    role,
                });
            }
            Ok(())
        })
    }

    fn lookup(&self, name: &str, role: KeyRole) -> Result<Option<[u8; 32]>> {
        self.with_conn(|conn| {
            let bytes = conn
                .query_row(
                    "SELECT key FROM directory WHERE name = ?1 AND role = ?2",
                    params![name, role.to_u8()],
                    |row| row.get::<_, Vec<u8>>(0),
                )
                .optional()?;

            match bytes {
                None => Ok(None),
                Some(bytes) => {
                    let key: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
                        StoreError::InvalidData(format!(
                            "directory key for {} has {} bytes",
                            name,
                            bytes.len()
                        ))
                    })?;
                    Ok(Some(key))
                }
            }
        })
    }
}
