//! Network collaborator: the `fetch(request) -> response | failure` capability.
//!
//! The worker never talks to the network directly; it goes through a
//! [`Fetcher`], which makes it possible to swap the HTTP client for a scripted
//! double in tests.

mod client;
mod error;

pub use client::HttpFetcher;
pub use error::FetchError;

use reqwest::header::HeaderMap;
use reqwest::Method;
use std::future::Future;
use url::Url;

use crate::cache::{CachedResponse, RequestKey};

/// An outgoing request from a client page.
#[derive(Debug, Clone)]
pub struct Request {
  pub method: Method,
  pub url: Url,
  pub headers: HeaderMap,
}

impl Request {
  pub fn new(method: Method, url: Url) -> Self {
    Self {
      method,
      url,
      headers: HeaderMap::new(),
    }
  }

  pub fn get(url: Url) -> Self {
    Self::new(Method::GET, url)
  }

  /// Canonical cache identity of this request.
  pub fn key(&self) -> RequestKey {
    RequestKey::new(&self.method, &self.url)
  }

  /// Path component used for static asset classification.
  pub fn path(&self) -> &str {
    self.url.path()
  }
}

/// Anything that can perform a network fetch.
///
/// Any HTTP response, whatever its status, is a successful fetch; only
/// transport failures are errors.
pub trait Fetcher: Send + Sync {
  fn fetch(&self, request: &Request)
    -> impl Future<Output = Result<CachedResponse, FetchError>> + Send;
}
