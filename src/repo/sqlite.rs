use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};

use super::KeyValueStore;

pub struct SqliteKeyValueStore {
    conn: Connection,
}

impl SqliteKeyValueStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = open_connection(path.as_ref())?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
            .with_context(|| format!("failed to read key {key}"))
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .with_context(|| format!("failed to write key {key}"))?;
        Ok(())
    }
}

/// Open (creating parent dirs) a connection that tolerates a second
/// connection writing to the same file.
pub(crate) fn open_connection(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create db dir {}", parent.display()))?;
    }
    let conn =
        Connection::open(path).with_context(|| format!("failed to open db {}", path.display()))?;
    conn.busy_timeout(Duration::from_secs(5))
        .context("failed to set busy timeout")?;
    Ok(conn)
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
PRAGMA journal_mode=WAL;
CREATE TABLE IF NOT EXISTS kv (
  key TEXT PRIMARY KEY,
  value BLOB NOT NULL
);
"#,
    )
    .context("failed to initialize schema")?;
    Ok(())
}

pub fn default_db_path() -> Result<PathBuf> {
    let base = dirs::data_dir().context("failed to resolve data dir")?;
    Ok(base.join("doit").join("doit.sqlite"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_store_round_trip() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut store = SqliteKeyValueStore::open(tmp.path()).unwrap();

        assert_eq!(store.get("tasksKey").unwrap(), None);
        store.set("tasksKey", b"[]").unwrap();
        store.set("tasksKey", b"[1]").unwrap();
        assert_eq!(store.get("tasksKey").unwrap(), Some(b"[1]".to_vec()));
        assert_eq!(store.get("otherKey").unwrap(), None);
    }

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("doit.sqlite");
        {
            let mut store = SqliteKeyValueStore::open(&path).unwrap();
            store.set("k", b"kept").unwrap();
        }
        let store = SqliteKeyValueStore::open(&path).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(b"kept".to_vec()));
    }
}
