//! String key-value blobs, the local-storage side of the database.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};

use super::Database;

#[derive(Clone)]
pub struct KvStore {
  db: Database,
}

impl KvStore {
  pub fn new(db: Database) -> Self {
    Self { db }
  }

  pub fn get(&self, key: &str) -> Result<Option<String>> {
    let conn = self.db.lock()?;

    conn
      .query_row(
        "SELECT value FROM kv_store WHERE key = ?",
        params![key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read {}: {}", key, e))
  }

  pub fn set(&self, key: &str, value: &str) -> Result<()> {
    let conn = self.db.lock()?;

    conn
      .execute(
        "INSERT OR REPLACE INTO kv_store (key, value, updated_at)
         VALUES (?, ?, datetime('now'))",
        params![key, value],
      )
      .map_err(|e| eyre!("Failed to write {}: {}", key, e))?;

    Ok(())
  }

  /// Read and deserialize a JSON value.
  pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
    match self.get(key)? {
      Some(raw) => serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| eyre!("Failed to parse {}: {}", key, e)),
      None => Ok(None),
    }
  }

  pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value).map_err(|e| eyre!("Failed to serialize {}: {}", key, e))?;
    self.set(key, &raw)
  }
}
