//! Cache layer implementing the cache-first and network-first strategies.

use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use super::storage::{CacheStorage, CachedEntry};
use super::traits::{CacheResult, CachedResponse, RequestKey};
use crate::network::FetchError;

/// Cache layer that manages caching logic around a network fetch.
///
/// Storage failures never fail a request: a failed read counts as a miss and
/// a failed write is logged and dropped. Only network errors reach the caller.
pub struct CacheLayer<S: CacheStorage> {
  storage: Arc<S>,
}

impl<S: CacheStorage> CacheLayer<S> {
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: Arc<S>) -> Self {
    Self { storage }
  }

  /// Serve from `namespace` if present, else fetch from the network.
  ///
  /// 1. Check cache - on a hit, return it without touching the network
  /// 2. On a miss, return the network result as is
  ///
  /// Misses are not written back; the namespace is only filled at install.
  pub async fn cache_first<F, Fut>(
    &self,
    namespace: &str,
    key: &RequestKey,
    fetcher: F,
  ) -> Result<CacheResult<CachedResponse>, FetchError>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<CachedResponse, FetchError>>,
  {
    if let Some(cached) = self.lookup(namespace, key).await {
      debug!(%key, namespace, "cache hit");
      return Ok(CacheResult::from_cache(cached.response, cached.cached_at));
    }

    debug!(%key, namespace, "cache miss, going to network");
    let response = fetcher().await?;
    Ok(CacheResult::from_network(response))
  }

  /// Prefer the network, keeping `namespace` warm as an offline fallback.
  ///
  /// 1. Fetch from network - on success store a copy, then return it
  /// 2. On network failure, return the last stored response (offline mode)
  /// 3. Without a stored response, return the network error
  pub async fn network_first<F, Fut>(
    &self,
    namespace: &str,
    key: &RequestKey,
    fetcher: F,
  ) -> Result<CacheResult<CachedResponse>, FetchError>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<CachedResponse, FetchError>>,
  {
    match fetcher().await {
      Ok(response) => {
        self.store(namespace, key, &response).await;
        Ok(CacheResult::from_network(response))
      }
      Err(err) => match self.lookup(namespace, key).await {
        Some(cached) => {
          debug!(%key, namespace, error = %err, "network failed, serving cached response");
          Ok(CacheResult::offline(cached.response, cached.cached_at))
        }
        None => {
          debug!(%key, namespace, error = %err, "network failed, nothing cached");
          Err(err)
        }
      },
    }
  }

  /// Write a response, logging instead of failing.
  async fn store(&self, namespace: &str, key: &RequestKey, response: &CachedResponse) {
    let handle = match self.storage.open(namespace).await {
      Ok(handle) => handle,
      Err(e) => {
        warn!(%key, namespace, error = %e, "failed to open cache, response not stored");
        return;
      }
    };

    if let Err(e) = self.storage.put(&handle, key, response).await {
      warn!(%key, namespace, error = %e, "failed to store response, continuing");
    }
  }

  /// Read an entry without creating the namespace. Failures count as a miss.
  async fn lookup(&self, namespace: &str, key: &RequestKey) -> Option<CachedEntry> {
    let handle = match self.storage.find(namespace).await {
      Ok(handle) => handle?,
      Err(e) => {
        warn!(namespace, error = %e, "failed to open cache, treating as empty");
        return None;
      }
    };

    match self.storage.get(&handle, key).await {
      Ok(entry) => entry,
      Err(e) => {
        warn!(%key, namespace = handle.namespace(), error = %e, "cache read failed, treating as miss");
        None
      }
    }
  }
}

impl<S: CacheStorage> Clone for CacheLayer<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
    }
  }
}
