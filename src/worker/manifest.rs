use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};

/// Shell assets cached when no manifest is configured.
const DEFAULT_ASSETS: &[&str] = &[
  "/",
  "/index.html",
  "/style.css",
  "/app.js",
  "/manifest.json",
  "/icons/icon-192.png",
  "/icons/icon-512.png",
];

/// Cache namespace tags for one deployment.
///
/// Both tags must change between deployments for activation to purge the
/// previous generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
  pub static_cache: String,
  pub dynamic_cache: String,
}

impl Generation {
  pub fn new(static_cache: impl Into<String>, dynamic_cache: impl Into<String>) -> Self {
    Self {
      static_cache: static_cache.into(),
      dynamic_cache: dynamic_cache.into(),
    }
  }

  /// Whether `namespace` belongs to this generation.
  pub fn owns(&self, namespace: &str) -> bool {
    namespace == self.static_cache || namespace == self.dynamic_cache
  }
}

impl Default for Generation {
  fn default() -> Self {
    Self::new("static-v1", "dynamic-v1")
  }
}

impl std::fmt::Display for Generation {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} + {}", self.static_cache, self.dynamic_cache)
  }
}

/// Ordered set of root-relative shell asset paths, fixed per deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticManifest {
  paths: Vec<String>,
}

impl StaticManifest {
  /// Build a manifest, keeping first occurrences of duplicate paths.
  pub fn new(paths: impl IntoIterator<Item = String>) -> Result<Self> {
    let mut unique: Vec<String> = Vec::new();
    for path in paths {
      if !path.starts_with('/') {
        return Err(eyre!("Manifest entry '{}' must be root-relative", path));
      }
      if !unique.contains(&path) {
        unique.push(path);
      }
    }
    Ok(Self { paths: unique })
  }

  /// Exact path match, no prefix or query handling.
  pub fn contains(&self, path: &str) -> bool {
    self.paths.iter().any(|p| p == path)
  }

  pub fn paths(&self) -> impl Iterator<Item = &str> {
    self.paths.iter().map(String::as_str)
  }
}

impl Default for StaticManifest {
  fn default() -> Self {
    Self {
      paths: DEFAULT_ASSETS.iter().map(|p| p.to_string()).collect(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_manifest_dedups_in_order() {
    let manifest = StaticManifest::new(
      ["/", "/app.js", "/", "/style.css"]
        .iter()
        .map(|p| p.to_string()),
    )
    .unwrap();
    assert_eq!(
      manifest.paths().collect::<Vec<_>>(),
      vec!["/", "/app.js", "/style.css"]
    );
  }

  #[test]
  fn test_manifest_exact_match_only() {
    let manifest = StaticManifest::default();
    assert!(manifest.contains("/index.html"));
    assert!(manifest.contains("/"));
    assert!(!manifest.contains("/index"));
    assert!(!manifest.contains("/icons/"));
  }

  #[test]
  fn test_generation_owns_its_tags_only() {
    let generation = Generation::new("static-v2", "dynamic-v2");
    assert!(generation.owns("static-v2"));
    assert!(generation.owns("dynamic-v2"));
    assert!(!generation.owns("static-v1"));
  }
}
