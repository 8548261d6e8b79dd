use thiserror::Error;

use crate::network::FetchError;

#[derive(Error, Debug)]
pub enum WorkerError {
  /// At least one manifest asset could not be fetched; nothing was cached.
  #[error("Install failed, {} of {total} static assets unavailable: {}", .failed.len(), .failed.join(", "))]
  Install { failed: Vec<String>, total: usize },

  #[error("No installed generation is waiting to activate")]
  NothingToActivate,

  #[error(transparent)]
  Network(#[from] FetchError),

  #[error("Cache storage error: {0}")]
  Storage(color_eyre::Report),
}
