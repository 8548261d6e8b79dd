//! Which generation controls clients, and which one is waiting to.

use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

use super::manifest::Generation;
use crate::db::KvStore;

const REGISTRATION_KEY: &str = "worker.registration";

/// Persisted worker registration.
///
/// Written at the end of a successful install (`waiting`) and at the end of
/// activation (`active`, clearing `waiting`). A failed install never touches it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
  pub active: Option<Generation>,
  pub waiting: Option<Generation>,
}

impl Registration {
  pub fn load(kv: &KvStore) -> Result<Self> {
    Ok(kv.get_json(REGISTRATION_KEY)?.unwrap_or_default())
  }

  pub fn save(&self, kv: &KvStore) -> Result<()> {
    kv.set_json(REGISTRATION_KEY, self)
  }
}

/// Broadcasts the controlling generation to every live interceptor.
///
/// Claiming replaces the controller at once, so requests from sessions
/// opened under an older generation are routed by the new one from their
/// next request on.
#[derive(Clone)]
pub struct Clients {
  tx: Arc<watch::Sender<Option<Generation>>>,
}

impl Clients {
  pub fn new(controller: Option<Generation>) -> Self {
    let (tx, _rx) = watch::channel(controller);
    Self { tx: Arc::new(tx) }
  }

  pub fn controller(&self) -> Option<Generation> {
    self.tx.borrow().clone()
  }

  pub fn subscribe(&self) -> watch::Receiver<Option<Generation>> {
    self.tx.subscribe()
  }

  /// Take control of all clients with `generation`.
  pub fn claim(&self, generation: Generation) {
    self.tx.send_replace(Some(generation));
  }
}
