//! Install and activate phases of the shell worker.

use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use url::Url;

use super::error::WorkerError;
use super::manifest::{Generation, StaticManifest};
use super::registration::{Clients, Registration};
use crate::cache::{CacheStorage, CachedResponse, RequestKey};
use crate::db::KvStore;
use crate::network::{FetchError, Fetcher, Request};

/// Lifecycle states of one worker generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
  /// Populating the static cache
  Installing,
  /// Installed, not controlling clients yet
  Waiting,
  /// Purging stale caches
  Activating,
  /// Controlling clients
  Active,
  /// Install failed, this generation will never activate
  Redundant,
}

impl std::fmt::Display for WorkerState {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      WorkerState::Installing => write!(f, "installing"),
      WorkerState::Waiting => write!(f, "waiting"),
      WorkerState::Activating => write!(f, "activating"),
      WorkerState::Active => write!(f, "active"),
      WorkerState::Redundant => write!(f, "redundant"),
    }
  }
}

/// Settings for one deployment.
#[derive(Debug, Clone)]
pub struct Deployment {
  pub origin: Url,
  pub generation: Generation,
  pub manifest: StaticManifest,
  pub skip_waiting: bool,
}

/// Outcome of [`Lifecycle::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleReport {
  pub state: WorkerState,
  /// Stale namespaces removed during activation
  pub purged: Vec<String>,
}

/// Drives a generation through install and activation.
///
/// Install is all-or-nothing: every manifest asset is fetched before anything
/// is written, and the whole set is stored in one batch. Activation only
/// starts after install completed and only reports `Active` once stale
/// caches are gone and clients are claimed.
pub struct Lifecycle<S: CacheStorage, N: Fetcher> {
  storage: Arc<S>,
  network: Arc<N>,
  kv: KvStore,
  clients: Clients,
  deployment: Deployment,
  state: watch::Sender<Option<WorkerState>>,
}

impl<S: CacheStorage, N: Fetcher> Lifecycle<S, N> {
  pub fn new(
    storage: Arc<S>,
    network: Arc<N>,
    kv: KvStore,
    clients: Clients,
    deployment: Deployment,
  ) -> Self {
    let (state, _rx) = watch::channel(None);
    Self {
      storage,
      network,
      kv,
      clients,
      deployment,
      state,
    }
  }

  /// Current state, `None` before install started.
  #[cfg(test)]
  pub fn state(&self) -> Option<WorkerState> {
    *self.state.borrow()
  }

  fn set_state(&self, state: WorkerState) {
    info!(generation = %self.deployment.generation, %state, "worker state changed");
    self.state.send_replace(Some(state));
  }

  /// Install, then activate right away when `skip_waiting` is set.
  pub async fn run(&self) -> Result<LifecycleReport, WorkerError> {
    self.install().await?;

    if !self.deployment.skip_waiting {
      info!("installed, waiting for explicit activation");
      return Ok(LifecycleReport {
        state: WorkerState::Waiting,
        purged: Vec::new(),
      });
    }

    let purged = self.activate().await?;
    Ok(LifecycleReport {
      state: WorkerState::Active,
      purged,
    })
  }

  /// Fetch every manifest asset and store them in the static cache.
  pub async fn install(&self) -> Result<(), WorkerError> {
    self.set_state(WorkerState::Installing);

    let Deployment {
      origin,
      generation,
      manifest,
      ..
    } = &self.deployment;
    let paths: Vec<&str> = manifest.paths().collect();
    info!(%generation, assets = paths.len(), "installing");

    let fetches = paths.iter().map(|path| async move {
      let fetched = match origin.join(path) {
        Ok(url) => {
          let request = Request::get(url);
          self
            .network
            .fetch(&request)
            .await
            .map(|response| (request.key(), response))
        }
        Err(e) => Err(FetchError::Other(e.to_string())),
      };
      (*path, fetched)
    });

    let mut entries: Vec<(RequestKey, CachedResponse)> = Vec::with_capacity(paths.len());
    let mut failed = Vec::new();
    for (path, fetched) in join_all(fetches).await {
      match fetched {
        Ok((key, response)) if response.is_success() => entries.push((key, response)),
        Ok((_, response)) => failed.push(format!("{} (status {})", path, response.status)),
        Err(e) => failed.push(format!("{} ({})", path, e)),
      }
    }

    if !failed.is_empty() {
      warn!(%generation, failed = ?failed, "install failed, keeping previous generation");
      self.set_state(WorkerState::Redundant);
      return Err(WorkerError::Install {
        failed,
        total: paths.len(),
      });
    }

    info!(cache = %generation.static_cache, "caching static assets");
    if let Err(e) = self.store_static(&entries).await {
      warn!(%generation, error = %e, "install failed while storing assets");
      self.set_state(WorkerState::Redundant);
      return Err(WorkerError::Storage(e));
    }

    self.set_state(WorkerState::Waiting);
    Ok(())
  }

  async fn store_static(&self, entries: &[(RequestKey, CachedResponse)]) -> color_eyre::Result<()> {
    let generation = &self.deployment.generation;
    let handle = self.storage.open(&generation.static_cache).await?;
    self.storage.put_all(&handle, entries).await?;

    let mut registration = Registration::load(&self.kv)?;
    registration.waiting = Some(generation.clone());
    registration.save(&self.kv)
  }

  /// Delete every namespace not owned by this generation, then claim clients.
  ///
  /// Returns the deleted namespaces.
  pub async fn activate(&self) -> Result<Vec<String>, WorkerError> {
    let generation = &self.deployment.generation;
    let mut registration = Registration::load(&self.kv).map_err(WorkerError::Storage)?;
    if registration.waiting.as_ref() != Some(generation) {
      return Err(WorkerError::NothingToActivate);
    }

    self.set_state(WorkerState::Activating);

    let purged = match self.purge_stale(generation).await {
      Ok(purged) => purged,
      Err(e) => {
        warn!(%generation, error = %e, "activation failed, still waiting");
        self.set_state(WorkerState::Waiting);
        return Err(WorkerError::Storage(e));
      }
    };

    registration.active = Some(generation.clone());
    registration.waiting = None;
    registration.save(&self.kv).map_err(WorkerError::Storage)?;

    self.clients.claim(generation.clone());
    self.set_state(WorkerState::Active);
    Ok(purged)
  }

  async fn purge_stale(&self, generation: &Generation) -> color_eyre::Result<Vec<String>> {
    let stale: Vec<String> = self
      .storage
      .list_namespaces()
      .await?
      .into_iter()
      .filter(|name| !generation.owns(name))
      .collect();

    let deletions = stale.iter().map(|name| async move {
      info!(cache = %name, "deleting stale cache");
      self.storage.delete(name).await
    });
    for deleted in join_all(deletions).await {
      deleted?;
    }

    Ok(stale)
  }
}
