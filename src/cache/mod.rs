//! Versioned response cache for offline support.
//!
//! This module provides the storage side of the offline shell:
//! - Responses are stored per namespace (one per cache generation)
//! - Requests are identified by a canonical method + URL key
//! - `CacheLayer` implements the cache-first and network-first strategies
//! - Storage failures degrade to cache misses instead of failing requests

mod layer;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use storage::{CacheStorage, SqliteStorage};
#[cfg(test)]
pub use storage::{CacheHandle, CachedEntry};
pub use traits::{CacheResult, CacheSource, CachedResponse, RequestKey};
