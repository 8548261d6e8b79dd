use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use futures::future::join_all;
use reqwest::Method;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::cache::{CacheResult, CacheSource, CacheStorage, CachedResponse, SqliteStorage};
use crate::catalog::{self, Catalog, Preferences, Product};
use crate::commands::{CatalogCommand, Command};
use crate::config::Config;
use crate::db::{Database, KvStore};
use crate::network::{HttpFetcher, Request};
use crate::worker::{
  Clients, Generation, Interceptor, Lifecycle, Registration, WorkerError, WorkerState,
};

/// Main application state, shared by every command
pub struct App {
  /// Application configuration
  config: Config,

  /// Local key-value store (catalog, theme, registration)
  kv: KvStore,

  /// Response cache
  storage: Arc<SqliteStorage>,

  /// HTTP client
  network: Arc<HttpFetcher>,

  /// Controller of all interceptors opened by this process
  clients: Clients,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let db = Database::open(config.storage.path.as_deref())?;
    let kv = KvStore::new(db.clone());
    let storage = Arc::new(SqliteStorage::new(db));
    let network = Arc::new(HttpFetcher::new(&config.network)?);

    let registration = Registration::load(&kv)?;
    let clients = Clients::new(registration.active);

    Ok(Self {
      config,
      kv,
      storage,
      network,
      clients,
    })
  }

  pub async fn run(&self, command: Command) -> Result<()> {
    match command {
      Command::Install => self.install().await,
      Command::Activate => self.activate().await,
      Command::Fetch {
        targets,
        method,
        output,
        include,
      } => self.fetch(&targets, &method, output.as_deref(), include).await,
      Command::Caches => self.caches().await,
      Command::Status => self.status().await,
      Command::Catalog(command) => self.catalog(command),
      Command::Theme { toggle } => self.theme(toggle),
    }
  }

  fn lifecycle(&self) -> Result<Lifecycle<SqliteStorage, HttpFetcher>> {
    Ok(Lifecycle::new(
      self.storage.clone(),
      self.network.clone(),
      self.kv.clone(),
      self.clients.clone(),
      self.config.deployment()?,
    ))
  }

  async fn install(&self) -> Result<()> {
    let report = self.lifecycle()?.run().await?;
    let generation = &self.config.generation;

    match report.state {
      WorkerState::Active => {
        println!("{} installed and active", generation);
        for name in report.purged {
          println!("  deleted {}", name);
        }
      }
      state => println!("{} installed ({}), run `activate` to take control", generation, state),
    }

    Ok(())
  }

  async fn activate(&self) -> Result<()> {
    let purged = match self.lifecycle()?.activate().await {
      Ok(purged) => purged,
      Err(WorkerError::NothingToActivate) => {
        return Err(eyre!(
          "{} is not waiting to activate, run `install` first",
          self.config.generation
        ))
      }
      Err(e) => return Err(e.into()),
    };

    println!("{} active", self.config.generation);
    for name in purged {
      println!("  deleted {}", name);
    }
    Ok(())
  }

  async fn fetch(
    &self,
    targets: &[String],
    method: &str,
    output: Option<&Path>,
    include: bool,
  ) -> Result<()> {
    let method = Method::from_bytes(method.to_uppercase().as_bytes())
      .map_err(|e| eyre!("Invalid method '{}': {}", method, e))?;
    if output.is_some() && targets.len() > 1 {
      return Err(eyre!("--output needs exactly one target"));
    }

    let requests = targets
      .iter()
      .map(|target| Ok(Request::new(method.clone(), self.config.resolve(target)?)))
      .collect::<Result<Vec<_>>>()?;

    let interceptor = Interceptor::new(
      self.storage.clone(),
      self.network.clone(),
      self.config.static_manifest()?,
      &self.clients,
    );
    let results = join_all(requests.iter().map(|r| interceptor.handle(r))).await;

    if let [result] = results.as_slice() {
      let result = result.as_ref().map_err(|e| eyre!("{}: {}", requests[0].url, e))?;
      return write_response(result, output, include);
    }

    let mut failures = 0;
    for (request, result) in requests.iter().zip(&results) {
      match result {
        Ok(result) => println!(
          "{} {:<7} {:>8}B  {}",
          result.data.status,
          result.source,
          result.data.body.len(),
          request.url
        ),
        Err(e) => {
          failures += 1;
          println!("ERR {:<7} {:>9}  {} ({})", "-", "-", request.url, e);
        }
      }
    }

    if failures > 0 {
      return Err(eyre!("{} of {} requests failed", failures, results.len()));
    }
    Ok(())
  }

  async fn caches(&self) -> Result<()> {
    let generation = &self.config.generation;
    for name in self.storage.list_namespaces().await? {
      let marker = if generation.owns(&name) { "*" } else { " " };
      println!("{} {}", marker, name);
    }
    Ok(())
  }

  async fn status(&self) -> Result<()> {
    let registration = Registration::load(&self.kv)?;
    let describe = |g: Option<&Generation>| {
      g.map(|g| g.to_string())
        .unwrap_or_else(|| "none".to_string())
    };

    println!("configured: {}", self.config.generation);
    println!("active:     {}", describe(registration.active.as_ref()));
    println!("waiting:    {}", describe(registration.waiting.as_ref()));
    println!("origin:     {}", self.config.origin);
    println!("caches:     {}", self.storage.list_namespaces().await?.join(", "));
    Ok(())
  }

  fn catalog(&self, command: CatalogCommand) -> Result<()> {
    let mut catalog = Catalog::load(self.kv.clone())?;

    match command {
      CatalogCommand::Add {
        name,
        price,
        category,
      } => {
        let product = catalog.add(&name, price, &category)?;
        println!("added {}", format_product(product));
      }
      CatalogCommand::Delete { id } => {
        if !catalog.delete(id)? {
          return Err(eyre!("No product with id {}", id));
        }
        println!("deleted {}", id);
      }
      CatalogCommand::List { category } => {
        print_products(&catalog.filter(category.as_deref()), "No products");
      }
      CatalogCommand::Search { term } => {
        print_products(&catalog.search(&term), "No products found");
      }
      CatalogCommand::Export { output } => {
        let document = catalog.export()?;
        let path = output
          .unwrap_or_else(|| PathBuf::from(catalog::export_file_name(Utc::now().date_naive())));

        if path.as_os_str() == "-" {
          println!("{}", document);
        } else {
          std::fs::write(&path, document)
            .map_err(|e| eyre!("Failed to write {}: {}", path.display(), e))?;
          info!(path = %path.display(), "catalog exported");
          println!("exported {} products to {}", catalog.products().len(), path.display());
        }
      }
      CatalogCommand::Import { file } => {
        let document = std::fs::read_to_string(&file)
          .map_err(|e| eyre!("Failed to read {}: {}", file.display(), e))?;
        let summary = catalog.import(&document)?;
        println!(
          "imported {} products ({} invalid entries skipped)",
          summary.imported, summary.dropped
        );
      }
    }

    Ok(())
  }

  fn theme(&self, toggle: bool) -> Result<()> {
    let preferences = Preferences::new(self.kv.clone());
    let theme = if toggle {
      preferences.toggle_theme()?
    } else {
      preferences.theme()?
    };
    println!("{}", theme.as_str());
    Ok(())
  }
}

fn write_response(
  result: &CacheResult<CachedResponse>,
  output: Option<&Path>,
  include: bool,
) -> Result<()> {
  let response = &result.data;

  if result.source == CacheSource::Offline {
    if let Some(cached_at) = result.cached_at {
      eprintln!(
        "offline, serving the copy cached at {}",
        cached_at.format("%Y-%m-%d %H:%M:%S UTC")
      );
    }
  }

  if include {
    match result.cached_at {
      Some(cached_at) => println!(
        "{} ({}, cached at {})",
        response.status,
        result.source,
        cached_at.to_rfc3339()
      ),
      None => println!("{} ({})", response.status, result.source),
    }
    for (name, value) in &response.headers {
      println!("{}: {}", name, value);
    }
    println!();
  }

  match output {
    Some(path) => std::fs::write(path, &response.body)
      .map_err(|e| eyre!("Failed to write {}: {}", path.display(), e)),
    None => {
      let mut stdout = std::io::stdout().lock();
      stdout.write_all(&response.body)?;
      stdout.flush()?;
      Ok(())
    }
  }
}

fn format_product(product: &Product) -> String {
  format!(
    "{:>13}  {:>10.2} €  {:<16}  {}",
    product.id,
    product.price,
    product.category_label(),
    product.name
  )
}

fn print_products(products: &[&Product], empty: &str) {
  if products.is_empty() {
    println!("{}", empty);
    return;
  }

  for product in products {
    println!("{}", format_product(product));
  }
  println!("{} products", products.len());
}
