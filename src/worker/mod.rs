//! Offline shell worker: lifecycle controller and fetch interceptor.
//!
//! A deployment is identified by a [`Generation`], a pair of cache namespace
//! tags. Installing a generation fills its static cache from the
//! [`StaticManifest`]; activating it deletes every other namespace and claims
//! all clients. From then on the [`Interceptor`] routes manifest paths
//! cache-first and everything else network-first.

mod error;
mod interceptor;
mod lifecycle;
mod manifest;
mod registration;
mod router;

pub use error::WorkerError;
pub use interceptor::Interceptor;
pub use lifecycle::{Deployment, Lifecycle, WorkerState};
pub use manifest::{Generation, StaticManifest};
pub use registration::{Clients, Registration};
