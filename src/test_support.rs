//! Test doubles shared by the unit tests.

use color_eyre::{eyre::eyre, Result};
use reqwest::Method;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use url::Url;

use crate::cache::{CacheHandle, CacheStorage, CachedEntry, CachedResponse, RequestKey};
use crate::network::{FetchError, Fetcher, Request};

pub const ORIGIN: &str = "http://localhost:8080";

pub fn url(path: &str) -> Url {
  Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

pub fn key(path: &str) -> RequestKey {
  RequestKey::new(&Method::GET, &url(path))
}

pub fn text(body: &str) -> CachedResponse {
  CachedResponse::new(
    200,
    vec![("content-type".to_string(), "text/plain".to_string())],
    body,
  )
}

/// Scripted origin server. Unknown paths answer 404, `unreachable` paths
/// and every path while offline fail at the transport level.
pub struct FakeNetwork {
  routes: Mutex<HashMap<String, CachedResponse>>,
  unreachable: Mutex<HashSet<String>>,
  online: AtomicBool,
  calls: AtomicUsize,
}

impl FakeNetwork {
  pub fn new() -> Self {
    Self {
      routes: Mutex::new(HashMap::new()),
      unreachable: Mutex::new(HashSet::new()),
      online: AtomicBool::new(true),
      calls: AtomicUsize::new(0),
    }
  }

  /// Serve the default shell assets plus `/api/data`.
  pub fn with_shell() -> Self {
    let network = Self::new();
    for path in crate::worker::StaticManifest::default().paths() {
      network.route(path, text(&format!("asset {}", path)));
    }
    network.route("/api/data", text("[]"));
    network
  }

  pub fn route(&self, path: &str, response: CachedResponse) {
    self
      .routes
      .lock()
      .unwrap()
      .insert(path.to_string(), response);
  }

  pub fn unreachable(&self, path: &str) {
    self.unreachable.lock().unwrap().insert(path.to_string());
  }

  pub fn set_online(&self, online: bool) {
    self.online.store(online, Ordering::SeqCst);
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

impl Fetcher for FakeNetwork {
  async fn fetch(&self, request: &Request) -> Result<CachedResponse, FetchError> {
    self.calls.fetch_add(1, Ordering::SeqCst);

    if !self.online.load(Ordering::SeqCst) {
      return Err(FetchError::Connect("offline".to_string()));
    }
    if self.unreachable.lock().unwrap().contains(request.path()) {
      return Err(FetchError::Timeout(request.path().to_string()));
    }

    let response = self.routes.lock().unwrap().get(request.path()).cloned();
    Ok(response.unwrap_or_else(|| CachedResponse::new(404, Vec::new(), "not found")))
  }
}

/// Storage whose every operation fails, as with a full disk.
pub struct FailingStorage;

impl CacheStorage for FailingStorage {
  async fn open(&self, _namespace: &str) -> Result<CacheHandle> {
    Err(eyre!("quota exceeded"))
  }

  async fn find(&self, _namespace: &str) -> Result<Option<CacheHandle>> {
    Err(eyre!("quota exceeded"))
  }

  async fn get(&self, _handle: &CacheHandle, _key: &RequestKey) -> Result<Option<CachedEntry>> {
    Err(eyre!("quota exceeded"))
  }

  async fn put(
    &self,
    _handle: &CacheHandle,
    _key: &RequestKey,
    _response: &CachedResponse,
  ) -> Result<()> {
    Err(eyre!("quota exceeded"))
  }

  async fn put_all(
    &self,
    _handle: &CacheHandle,
    _entries: &[(RequestKey, CachedResponse)],
  ) -> Result<()> {
    Err(eyre!("quota exceeded"))
  }

  async fn list_namespaces(&self) -> Result<Vec<String>> {
    Err(eyre!("quota exceeded"))
  }

  async fn delete(&self, _namespace: &str) -> Result<bool> {
    Err(eyre!("quota exceeded"))
  }
}

/// Storage whose namespaces open fine but whose entries cannot be read or
/// written, as with a corrupt database page.
pub struct BrokenEntries;

impl BrokenEntries {
  fn handle(namespace: &str) -> CacheHandle {
    CacheHandle {
      namespace: namespace.to_string(),
    }
  }
}

impl CacheStorage for BrokenEntries {
  async fn open(&self, namespace: &str) -> Result<CacheHandle> {
    Ok(Self::handle(namespace))
  }

  async fn find(&self, namespace: &str) -> Result<Option<CacheHandle>> {
    Ok(Some(Self::handle(namespace)))
  }

  async fn get(&self, _handle: &CacheHandle, _key: &RequestKey) -> Result<Option<CachedEntry>> {
    Err(eyre!("database disk image is malformed"))
  }

  async fn put(
    &self,
    _handle: &CacheHandle,
    _key: &RequestKey,
    _response: &CachedResponse,
  ) -> Result<()> {
    Err(eyre!("database disk image is malformed"))
  }

  async fn put_all(
    &self,
    _handle: &CacheHandle,
    _entries: &[(RequestKey, CachedResponse)],
  ) -> Result<()> {
    Err(eyre!("database disk image is malformed"))
  }

  async fn list_namespaces(&self) -> Result<Vec<String>> {
    Ok(Vec::new())
  }

  async fn delete(&self, _namespace: &str) -> Result<bool> {
    Ok(false)
  }
}
