use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;
use url::Url;

use crate::worker::{Deployment, Generation, StaticManifest};

/// Environment variable overriding the configured origin.
const ORIGIN_ENV: &str = "CATALOG_SHELL_ORIGIN";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Origin the shell and its API are served from
  pub origin: String,
  /// Cache namespace tags for this deployment
  pub generation: Generation,
  /// Root-relative paths cached at install time
  pub manifest: Vec<String>,
  /// Activate right after a successful install instead of waiting
  pub skip_waiting: bool,
  pub storage: StorageConfig,
  pub network: NetworkConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
  /// Database file (defaults to the platform data directory)
  pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetworkConfig {
  /// Per-request timeout. Unset means the client never gives up on its own.
  pub timeout_secs: Option<u64>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      origin: "http://localhost:8080".to_string(),
      generation: Generation::default(),
      manifest: StaticManifest::default().paths().map(String::from).collect(),
      skip_waiting: true,
      storage: StorageConfig::default(),
      network: NetworkConfig::default(),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./catalog-shell.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/catalog-shell/config.yaml
  ///
  /// Falls back to built-in defaults when no file exists.
  /// `CATALOG_SHELL_ORIGIN` overrides the origin in every case.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => {
        info!("no configuration file found, using defaults");
        Self::default()
      }
    };

    if let Ok(origin) = std::env::var(ORIGIN_ENV) {
      config.origin = origin;
    }

    config.validate()?;
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("catalog-shell.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("catalog-shell").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    info!(path = %path.display(), "loaded configuration");
    Ok(config)
  }

  /// Check invariants serde cannot express.
  pub fn validate(&self) -> Result<()> {
    self.origin_url()?;
    self.static_manifest()?;

    let Generation {
      static_cache,
      dynamic_cache,
    } = &self.generation;
    if static_cache.is_empty() || dynamic_cache.is_empty() {
      return Err(eyre!("Cache generation tags must not be empty"));
    }
    if static_cache == dynamic_cache {
      return Err(eyre!(
        "Static and dynamic caches must use different tags (both are '{}')",
        static_cache
      ));
    }

    Ok(())
  }

  pub fn origin_url(&self) -> Result<Url> {
    Url::parse(&self.origin).map_err(|e| eyre!("Invalid origin '{}': {}", self.origin, e))
  }

  pub fn static_manifest(&self) -> Result<StaticManifest> {
    StaticManifest::new(self.manifest.iter().cloned())
  }

  /// Settings the lifecycle controller runs with.
  pub fn deployment(&self) -> Result<Deployment> {
    Ok(Deployment {
      origin: self.origin_url()?,
      generation: self.generation.clone(),
      manifest: self.static_manifest()?,
      skip_waiting: self.skip_waiting,
    })
  }

  /// Resolve a command line target: absolute URLs are kept, anything else
  /// is joined onto the origin.
  pub fn resolve(&self, target: &str) -> Result<Url> {
    if let Ok(url) = Url::parse(target) {
      return Ok(url);
    }

    self
      .origin_url()?
      .join(target)
      .map_err(|e| eyre!("Invalid request target '{}': {}", target, e))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_deployment() {
    let config = Config::default();
    assert_eq!(config.generation.static_cache, "static-v1");
    assert_eq!(config.generation.dynamic_cache, "dynamic-v1");
    assert_eq!(config.manifest.len(), 7);
    assert!(config.manifest.contains(&"/index.html".to_string()));
    assert!(config.skip_waiting);
    config.validate().unwrap();
  }

  #[test]
  fn test_partial_yaml_keeps_defaults() {
    let config: Config = serde_yaml::from_str(
      r#"
origin: "https://shop.example.com"
generation:
  static_cache: static-v2
  dynamic_cache: dynamic-v2
network:
  timeout_secs: 10
"#,
    )
    .unwrap();

    assert_eq!(config.generation.static_cache, "static-v2");
    assert_eq!(config.network.timeout_secs, Some(10));
    assert_eq!(config.manifest, Config::default().manifest);
    config.validate().unwrap();
  }

  #[test]
  fn test_validate_rejects_shared_tags() {
    let mut config = Config::default();
    config.generation.dynamic_cache = config.generation.static_cache.clone();
    assert!(config.validate().is_err());
  }

  #[test]
  fn test_validate_rejects_relative_manifest_entries() {
    let config = Config {
      manifest: vec!["index.html".to_string()],
      ..Config::default()
    };
    assert!(config.validate().is_err());
  }

  #[test]
  fn test_resolve_targets() {
    let config = Config::default();
    assert_eq!(
      config.resolve("/api/data").unwrap().as_str(),
      "http://localhost:8080/api/data"
    );
    assert_eq!(
      config.resolve("https://cdn.example.com/x.js").unwrap().as_str(),
      "https://cdn.example.com/x.js"
    );
  }

  #[test]
  fn test_missing_explicit_config_is_error() {
    assert!(Config::load(Some(Path::new("/nonexistent/catalog-shell.yaml"))).is_err());
  }
}
