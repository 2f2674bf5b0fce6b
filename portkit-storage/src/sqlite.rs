//! SQLite storage backend.
//!
//! One table holds every namespace; the `(namespace, key)` primary key gives
//! the uniqueness the registry's prefix families rely on.

use crate::{StorageAdapter, StorageError, StorageResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Persistent key-value store backed by SQLite.
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        debug!("opening sqlite storage at {}", path.display());
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StorageResult<()> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS kv (
                namespace TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (namespace, key)
            );
            ",
        )?;
        Ok(())
    }

    /// Lists the namespaces that hold at least one key.
    pub fn namespaces(&self) -> StorageResult<Vec<String>> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        let mut stmt = conn.prepare("SELECT DISTINCT namespace FROM kv ORDER BY namespace")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

/// Escapes LIKE wildcards so a prefix matches literally.
fn like_prefix(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

impl StorageAdapter for SqliteStorage {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn get_raw(&self, namespace: &str, key: &str) -> StorageResult<Option<String>> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        let value = conn
            .query_row(
                "SELECT value FROM kv WHERE namespace = ?1 AND key = ?2",
                params![namespace, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_raw(&self, namespace: &str, key: &str, value: &str) -> StorageResult<()> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        conn.execute(
            "INSERT INTO kv (namespace, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(namespace, key) DO UPDATE SET value = excluded.value",
            params![namespace, key, value],
        )?;
        Ok(())
    }

    fn remove(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        let n = conn.execute(
            "DELETE FROM kv WHERE namespace = ?1 AND key = ?2",
            params![namespace, key],
        )?;
        Ok(n > 0)
    }

    fn keys(&self, namespace: &str) -> StorageResult<Vec<String>> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        let mut stmt = conn.prepare("SELECT key FROM kv WHERE namespace = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![namespace], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn has(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        let found = conn
            .query_row(
                "SELECT 1 FROM kv WHERE namespace = ?1 AND key = ?2",
                params![namespace, key],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn keys_with_prefix(&self, namespace: &str, prefix: &str) -> StorageResult<Vec<String>> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        let mut stmt = conn.prepare(
            "SELECT key FROM kv WHERE namespace = ?1 AND key LIKE ?2 ESCAPE '\\' ORDER BY key",
        )?;
        let rows = stmt.query_map(params![namespace, like_prefix(prefix)], |row| {
            row.get::<_, String>(0)
        })?;
        // LIKE is case-insensitive for ASCII in SQLite; re-check the exact prefix.
        Ok(rows
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter(|k| k.starts_with(prefix))
            .collect())
    }
}
