use reqwest::Method;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use super::error::WorkerError;
use super::manifest::{Generation, StaticManifest};
use super::registration::Clients;
use super::router::{classify, RequestClass};
use crate::cache::{CacheLayer, CacheResult, CacheStorage, CachedResponse};
use crate::network::{Fetcher, Request};

/// Entry point for every request from a client page.
///
/// While no generation controls the client, requests go straight to the
/// network. Once a generation is claimed, manifest paths are served
/// cache-first from its static cache and everything else network-first
/// through its dynamic cache. Only GET requests are ever cached or answered
/// from a cache; other methods always go to the network.
pub struct Interceptor<S: CacheStorage, N: Fetcher> {
  layer: CacheLayer<S>,
  network: Arc<N>,
  manifest: StaticManifest,
  controller: watch::Receiver<Option<Generation>>,
}

impl<S: CacheStorage, N: Fetcher> Interceptor<S, N> {
  pub fn new(storage: Arc<S>, network: Arc<N>, manifest: StaticManifest, clients: &Clients) -> Self {
    Self {
      layer: CacheLayer::new(storage),
      network,
      manifest,
      controller: clients.subscribe(),
    }
  }

  pub async fn handle(&self, request: &Request) -> Result<CacheResult<CachedResponse>, WorkerError> {
    let controller = self.controller.borrow().clone();
    let fetch = || self.network.fetch(request);

    let Some(generation) = controller else {
      debug!(url = %request.url, "client not controlled, using default network handling");
      return Ok(CacheResult::from_network(fetch().await?));
    };

    if request.method != Method::GET {
      debug!(method = %request.method, url = %request.url, "not a GET, bypassing cache");
      return Ok(CacheResult::from_network(fetch().await?));
    }

    let key = request.key();
    let result = match classify(&self.manifest, request) {
      RequestClass::Static => {
        self
          .layer
          .cache_first(&generation.static_cache, &key, fetch)
          .await?
      }
      RequestClass::Dynamic => {
        self
          .layer
          .network_first(&generation.dynamic_cache, &key, fetch)
          .await?
      }
    };

    debug!(%key, source = %result.source, status = result.data.status, "request served");
    Ok(result)
  }
}
