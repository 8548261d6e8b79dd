//! Core types for the response cache: request identity, response snapshots
//! and strategy results.

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

/// Canonical identity of a request, used as the cache key.
///
/// The identity is the uppercase method plus the normalized URL: scheme and
/// host are lowercased by URL parsing, the fragment is dropped and an empty
/// query (`/path?`) is treated as no query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
  canonical: String,
}

impl RequestKey {
  pub fn new(method: &Method, url: &Url) -> Self {
    let mut url = url.clone();
    url.set_fragment(None);
    if url.query() == Some("") {
      url.set_query(None);
    }

    Self {
      canonical: format!("{} {}", method.as_str().to_uppercase(), url),
    }
  }

  /// SHA256 of the canonical form, for stable fixed-length storage keys.
  pub fn cache_hash(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.canonical.as_bytes());
    hex::encode(hasher.finalize())
  }

  /// Human readable form (e.g. `GET http://localhost/index.html`).
  pub fn description(&self) -> &str {
    &self.canonical
  }
}

impl std::fmt::Display for RequestKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.canonical)
  }
}

/// Snapshot of a full response: status, headers and the buffered body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
  pub status: u16,
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
}

impl CachedResponse {
  pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Vec<u8>>) -> Self {
    Self {
      status,
      headers,
      body: body.into(),
    }
  }

  /// True for 2xx statuses.
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

/// Result from a strategy, including the response and where it came from.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was cached (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
    }
  }

  /// Create a new cache result from a cache hit.
  pub fn from_cache(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
      cached_at: Some(cached_at),
    }
  }

  /// Create a new cache result for offline mode.
  pub fn offline(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Offline,
      cached_at: Some(cached_at),
    }
  }
}

/// Indicates where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Live network response
  Network,
  /// Cache hit, network not consulted
  Cache,
  /// Network failed, serving the last stored response
  Offline,
}

impl std::fmt::Display for CacheSource {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      CacheSource::Network => write!(f, "network"),
      CacheSource::Cache => write!(f, "cache"),
      CacheSource::Offline => write!(f, "offline"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn key(method: Method, url: &str) -> RequestKey {
    RequestKey::new(&method, &Url::parse(url).unwrap())
  }

  #[test]
  fn test_key_ignores_fragment_and_empty_query() {
    let plain = key(Method::GET, "http://localhost:8080/api/data");
    assert_eq!(plain, key(Method::GET, "http://localhost:8080/api/data#top"));
    assert_eq!(plain, key(Method::GET, "http://localhost:8080/api/data?"));
    assert_eq!(plain, key(Method::GET, "HTTP://LOCALHOST:8080/api/data"));
  }

  #[test]
  fn test_key_distinguishes_method_and_query() {
    let get = key(Method::GET, "http://localhost/api/data?page=1");
    assert_ne!(get, key(Method::POST, "http://localhost/api/data?page=1"));
    assert_ne!(get, key(Method::GET, "http://localhost/api/data?page=2"));
    assert_eq!(get.description(), "GET http://localhost/api/data?page=1");
  }

  #[test]
  fn test_cache_hash_is_stable_hex() {
    let a = key(Method::GET, "http://localhost/index.html");
    let b = key(Method::GET, "http://localhost/index.html");
    assert_eq!(a.cache_hash(), b.cache_hash());
    assert_eq!(a.cache_hash().len(), 64);
  }

  #[test]
  fn test_only_2xx_is_success() {
    let response = CachedResponse::new(
      200,
      vec![("Content-Type".to_string(), "text/html".to_string())],
      "<html></html>",
    );
    assert!(response.is_success());
    assert!(!CachedResponse::new(404, Vec::new(), Vec::new()).is_success());
  }
}
