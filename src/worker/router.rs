use super::manifest::StaticManifest;
use crate::network::Request;

/// Routing class of a request, recomputed for every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
  /// Path is a manifest entry: cache-first from the static cache
  Static,
  /// Anything else: network-first with the dynamic cache as fallback
  Dynamic,
}

/// Classify a request by exact path match against the manifest.
/// The query string and origin play no part.
pub fn classify(manifest: &StaticManifest, request: &Request) -> RequestClass {
  if manifest.contains(request.path()) {
    RequestClass::Static
  } else {
    RequestClass::Dynamic
  }
}
