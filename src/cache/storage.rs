//! Cache storage trait and SQLite implementation.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, OptionalExtension};
use std::future::Future;

use super::traits::{CachedResponse, RequestKey};
use crate::db::Database;

/// Handle to an opened cache namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheHandle {
  pub(crate) namespace: String,
}

impl CacheHandle {
  pub fn namespace(&self) -> &str {
    &self.namespace
  }
}

/// A single stored response.
#[derive(Debug, Clone)]
pub struct CachedEntry {
  /// The stored response
  pub response: CachedResponse,
  /// When the response was stored
  pub cached_at: DateTime<Utc>,
}

/// Trait for cache storage backends.
///
/// Storage is partitioned into named namespaces. Every operation may fail;
/// callers decide whether a failure is fatal.
pub trait CacheStorage: Send + Sync {
  /// Open a namespace, creating it if it does not exist yet.
  fn open(&self, namespace: &str) -> impl Future<Output = Result<CacheHandle>> + Send;

  /// Look up an existing namespace without creating it.
  fn find(&self, namespace: &str) -> impl Future<Output = Result<Option<CacheHandle>>> + Send;

  /// Look up the response stored for a request.
  fn get(
    &self,
    handle: &CacheHandle,
    key: &RequestKey,
  ) -> impl Future<Output = Result<Option<CachedEntry>>> + Send;

  /// Store a response, replacing any previous one for the same request.
  fn put(
    &self,
    handle: &CacheHandle,
    key: &RequestKey,
    response: &CachedResponse,
  ) -> impl Future<Output = Result<()>> + Send;

  /// Store several responses at once. Either all entries are written or none.
  fn put_all(
    &self,
    handle: &CacheHandle,
    entries: &[(RequestKey, CachedResponse)],
  ) -> impl Future<Output = Result<()>> + Send;

  /// List all existing namespaces.
  fn list_namespaces(&self) -> impl Future<Output = Result<Vec<String>>> + Send;

  /// Delete a namespace and all of its entries. Returns false if it did not exist.
  fn delete(&self, namespace: &str) -> impl Future<Output = Result<bool>> + Send;
}

/// SQLite-based cache storage implementation.
#[derive(Clone)]
pub struct SqliteStorage {
  db: Database,
}

impl SqliteStorage {
  pub fn new(db: Database) -> Self {
    Self { db }
  }
}

impl CacheStorage for SqliteStorage {
  async fn open(&self, namespace: &str) -> Result<CacheHandle> {
    let conn = self.db.lock()?;

    conn
      .execute(
        "INSERT OR IGNORE INTO cache_namespaces (name) VALUES (?)",
        params![namespace],
      )
      .map_err(|e| eyre!("Failed to open cache {}: {}", namespace, e))?;

    Ok(CacheHandle {
      namespace: namespace.to_string(),
    })
  }

  async fn find(&self, namespace: &str) -> Result<Option<CacheHandle>> {
    let conn = self.db.lock()?;

    let exists = conn
      .query_row(
        "SELECT 1 FROM cache_namespaces WHERE name = ?",
        params![namespace],
        |_| Ok(()),
      )
      .optional()
      .map_err(|e| eyre!("Failed to look up cache {}: {}", namespace, e))?
      .is_some();

    Ok(exists.then(|| CacheHandle {
      namespace: namespace.to_string(),
    }))
  }

  async fn get(&self, handle: &CacheHandle, key: &RequestKey) -> Result<Option<CachedEntry>> {
    let conn = self.db.lock()?;

    let mut stmt = conn
      .prepare(
        "SELECT status, headers, body, cached_at FROM cache_entries
         WHERE namespace = ? AND request_hash = ?",
      )
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let row: Option<(u16, String, Vec<u8>, String)> = stmt
      .query_row(params![handle.namespace, key.cache_hash()], |row| {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
      })
      .optional()
      .map_err(|e| eyre!("Failed to read cache entry {}: {}", key, e))?;

    match row {
      Some((status, headers, body, cached_at)) => {
        let headers: Vec<(String, String)> = serde_json::from_str(&headers)
          .map_err(|e| eyre!("Failed to deserialize headers for {}: {}", key, e))?;
        Ok(Some(CachedEntry {
          response: CachedResponse::new(status, headers, body),
          cached_at: parse_datetime(&cached_at)?,
        }))
      }
      None => Ok(None),
    }
  }

  async fn put(&self, handle: &CacheHandle, key: &RequestKey, response: &CachedResponse) -> Result<()> {
    let conn = self.db.lock()?;
    insert_entry(&conn, handle, key, response)
  }

  async fn put_all(
    &self,
    handle: &CacheHandle,
    entries: &[(RequestKey, CachedResponse)],
  ) -> Result<()> {
    let mut conn = self.db.lock()?;

    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    for (key, response) in entries {
      insert_entry(&tx, handle, key, response)?;
    }

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(())
  }

  async fn list_namespaces(&self) -> Result<Vec<String>> {
    let conn = self.db.lock()?;

    let mut stmt = conn
      .prepare("SELECT name FROM cache_namespaces ORDER BY name")
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let names = stmt
      .query_map([], |row| row.get(0))
      .map_err(|e| eyre!("Failed to list caches: {}", e))?
      .collect::<rusqlite::Result<Vec<String>>>()
      .map_err(|e| eyre!("Failed to list caches: {}", e))?;

    Ok(names)
  }

  async fn delete(&self, namespace: &str) -> Result<bool> {
    let conn = self.db.lock()?;

    let removed = conn
      .execute(
        "DELETE FROM cache_namespaces WHERE name = ?",
        params![namespace],
      )
      .map_err(|e| eyre!("Failed to delete cache {}: {}", namespace, e))?;

    Ok(removed > 0)
  }
}

/// Upsert a single entry. The namespace must exist.
fn insert_entry(
  conn: &rusqlite::Connection,
  handle: &CacheHandle,
  key: &RequestKey,
  response: &CachedResponse,
) -> Result<()> {
  let headers = serde_json::to_string(&response.headers)
    .map_err(|e| eyre!("Failed to serialize headers: {}", e))?;

  conn
    .execute(
      "INSERT OR REPLACE INTO cache_entries
         (namespace, request_hash, request_description, status, headers, body, cached_at)
       VALUES (?, ?, ?, ?, ?, ?, datetime('now'))",
      params![
        handle.namespace,
        key.cache_hash(),
        key.description(),
        response.status,
        headers,
        response.body,
      ],
    )
    .map_err(|e| eyre!("Failed to store cache entry {}: {}", key, e))?;

  Ok(())
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}

#[cfg(test)]
mod tests {
  use super::*;
  use reqwest::Method;
  use url::Url;

  fn storage() -> SqliteStorage {
    SqliteStorage::new(Database::open_in_memory().unwrap())
  }

  fn key(path: &str) -> RequestKey {
    let url = Url::parse("http://localhost").unwrap().join(path).unwrap();
    RequestKey::new(&Method::GET, &url)
  }

  fn html(body: &str) -> CachedResponse {
    CachedResponse::new(
      200,
      vec![("content-type".to_string(), "text/html".to_string())],
      body,
    )
  }

  #[tokio::test]
  async fn test_put_then_get() {
    let storage = storage();
    let handle = storage.open("static-v1").await.unwrap();

    assert!(storage.get(&handle, &key("/")).await.unwrap().is_none());

    storage.put(&handle, &key("/"), &html("shell")).await.unwrap();
    let entry = storage.get(&handle, &key("/")).await.unwrap().unwrap();
    assert_eq!(entry.response, html("shell"));
  }

  #[tokio::test]
  async fn test_put_overwrites() {
    let storage = storage();
    let handle = storage.open("dynamic-v1").await.unwrap();

    storage.put(&handle, &key("/api/data"), &html("one")).await.unwrap();
    storage.put(&handle, &key("/api/data"), &html("two")).await.unwrap();

    let entry = storage.get(&handle, &key("/api/data")).await.unwrap().unwrap();
    assert_eq!(entry.response.body, b"two");
  }

  #[tokio::test]
  async fn test_namespaces_are_isolated() {
    let storage = storage();
    let a = storage.open("static-v1").await.unwrap();
    let b = storage.open("dynamic-v1").await.unwrap();

    storage.put(&a, &key("/"), &html("a")).await.unwrap();
    assert!(storage.get(&b, &key("/")).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn test_delete_removes_entries() {
    let storage = storage();
    let handle = storage.open("static-v1").await.unwrap();
    storage.put(&handle, &key("/"), &html("shell")).await.unwrap();

    assert!(storage.delete("static-v1").await.unwrap());
    assert!(!storage.delete("static-v1").await.unwrap());
    assert!(storage.list_namespaces().await.unwrap().is_empty());

    // Reopening gives an empty namespace
    let handle = storage.open("static-v1").await.unwrap();
    assert!(storage.get(&handle, &key("/")).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn test_put_into_deleted_namespace_fails() {
    let storage = storage();
    let handle = storage.open("dynamic-v1").await.unwrap();
    storage.delete("dynamic-v1").await.unwrap();

    assert!(storage.put(&handle, &key("/x"), &html("x")).await.is_err());
    assert!(storage.list_namespaces().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_put_all_is_atomic() {
    let storage = storage();
    let handle = storage.open("static-v1").await.unwrap();
    let entries = vec![(key("/"), html("root")), (key("/app.js"), html("js"))];
    storage.put_all(&handle, &entries).await.unwrap();
    assert!(storage.get(&handle, &key("/app.js")).await.unwrap().is_some());

    // A batch into a missing namespace must not leave anything behind
    let orphan = CacheHandle {
      namespace: "static-v2".to_string(),
    };
    assert!(storage.put_all(&orphan, &entries).await.is_err());
    assert_eq!(storage.list_namespaces().await.unwrap(), vec!["static-v1"]);
  }

  #[tokio::test]
  async fn test_find_does_not_create() {
    let storage = storage();
    assert_eq!(storage.find("static-v1").await.unwrap(), None);
    assert!(storage.list_namespaces().await.unwrap().is_empty());

    let handle = storage.open("static-v1").await.unwrap();
    assert_eq!(storage.find("static-v1").await.unwrap(), Some(handle));
  }

  #[tokio::test]
  async fn test_list_namespaces_sorted() {
    let storage = storage();
    for name in ["static-v2", "dynamic-v1", "static-v1"] {
      storage.open(name).await.unwrap();
    }
    // Opening twice does not duplicate
    storage.open("static-v1").await.unwrap();

    assert_eq!(
      storage.list_namespaces().await.unwrap(),
      vec!["dynamic-v1", "static-v1", "static-v2"]
    );
  }
}
