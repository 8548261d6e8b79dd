//! Product catalog persisted in the local key-value store.
//!
//! The catalog is a flat list, newest first, saved as one JSON blob after
//! every mutation. It is loaded once when the catalog is opened; entries
//! that lost their name or price are dropped at that point.

mod error;
mod product;
mod theme;

pub use error::CatalogError;
pub use product::Product;
pub use theme::Preferences;

use chrono::{NaiveDate, Utc};
use color_eyre::Result;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::db::KvStore;

const PRODUCTS_KEY: &str = "products";

/// Counts reported by [`Catalog::import`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
  pub imported: usize,
  pub dropped: usize,
}

pub struct Catalog {
  kv: KvStore,
  products: Vec<Product>,
}

impl Catalog {
  /// Load the catalog from the store.
  ///
  /// A corrupt blob yields an empty catalog. Invalid entries are dropped and
  /// the cleaned list is written back.
  pub fn load(kv: KvStore) -> Result<Self> {
    let mut catalog = Self {
      kv,
      products: Vec::new(),
    };

    let Some(raw) = catalog.kv.get(PRODUCTS_KEY)? else {
      return Ok(catalog);
    };

    let entries = match serde_json::from_str::<Value>(&raw) {
      Ok(Value::Array(entries)) => entries,
      Ok(_) | Err(_) => {
        warn!("stored catalog is not a JSON array, starting empty");
        return Ok(catalog);
      }
    };

    let sanitized = sanitize(&entries);
    catalog.products = sanitized.products;
    if sanitized.dropped > 0 || sanitized.renumbered > 0 {
      info!(
        dropped = sanitized.dropped,
        renumbered = sanitized.renumbered,
        "repaired stored catalog"
      );
      catalog.save()?;
    }

    Ok(catalog)
  }

  fn save(&self) -> Result<()> {
    self.kv.set_json(PRODUCTS_KEY, &self.products)
  }

  pub fn products(&self) -> &[Product] {
    &self.products
  }

  /// Add a product at the top of the list.
  ///
  /// Rejects what a later load would drop: a blank name or a price that is
  /// not a finite number.
  pub fn add(&mut self, name: &str, price: f64, category: &str) -> Result<&Product> {
    let name = name.trim();
    if name.is_empty() {
      return Err(CatalogError::InvalidProduct("name must not be empty").into());
    }
    if !price.is_finite() {
      return Err(CatalogError::InvalidProduct("price must be a finite number").into());
    }

    let now = Utc::now();
    let product = Product {
      id: self.next_id(now.timestamp_millis()),
      name: name.to_string(),
      price,
      category: category.trim().to_string(),
      created_at: Some(now),
    };

    info!(id = product.id, name = %product.name, "product added");
    self.products.insert(0, product);
    self.save()?;
    Ok(&self.products[0])
  }

  /// Remove a product. Returns false when no product has this id.
  pub fn delete(&mut self, id: i64) -> Result<bool> {
    let before = self.products.len();
    self.products.retain(|p| p.id != id);
    if self.products.len() == before {
      return Ok(false);
    }

    self.save()?;
    Ok(true)
  }

  /// All products, or those whose category equals `category` exactly.
  pub fn filter(&self, category: Option<&str>) -> Vec<&Product> {
    match category {
      None => self.products.iter().collect(),
      Some(category) => self
        .products
        .iter()
        .filter(|p| p.category == category)
        .collect(),
    }
  }

  /// Case-insensitive substring search over name and category.
  pub fn search(&self, term: &str) -> Vec<&Product> {
    let term = term.to_lowercase();
    self
      .products
      .iter()
      .filter(|p| p.name.to_lowercase().contains(&term) || p.category.to_lowercase().contains(&term))
      .collect()
  }

  /// The whole catalog as a pretty-printed JSON document.
  pub fn export(&self) -> Result<String> {
    Ok(serde_json::to_string_pretty(&self.products)?)
  }

  /// Replace the catalog with the products of a JSON document.
  ///
  /// The document must be an array. Entries are sanitized with the same rule
  /// as on load; the catalog is left untouched when the document is rejected.
  pub fn import(&mut self, document: &str) -> Result<ImportSummary, CatalogError> {
    let entries = match serde_json::from_str::<Value>(document)? {
      Value::Array(entries) => entries,
      _ => return Err(CatalogError::InvalidFormat),
    };

    let sanitized = sanitize(&entries);
    let summary = ImportSummary {
      imported: sanitized.products.len(),
      dropped: sanitized.dropped,
    };

    self.products = sanitized.products;
    self.save().map_err(CatalogError::Storage)?;

    info!(
      imported = summary.imported,
      dropped = summary.dropped,
      renumbered = sanitized.renumbered,
      "catalog imported"
    );
    Ok(summary)
  }

  /// A millisecond id, bumped past any existing one.
  fn next_id(&self, now_ms: i64) -> i64 {
    let max = self.products.iter().map(|p| p.id).max().unwrap_or(i64::MIN);
    now_ms.max(max.saturating_add(1))
  }
}

struct Sanitized {
  products: Vec<Product>,
  /// Entries without a usable name or price
  dropped: usize,
  /// Entries whose id was already taken and got a fresh one
  renumbered: usize,
}

/// Keep the valid entries of an untrusted list, in order, with unique ids.
fn sanitize(entries: &[Value]) -> Sanitized {
  let mut next_fallback = Utc::now().timestamp_millis();
  let mut products: Vec<Product> = entries
    .iter()
    .filter_map(|entry| {
      let product = Product::from_untrusted(entry, next_fallback)?;
      if product.id == next_fallback {
        next_fallback += 1;
      }
      Some(product)
    })
    .collect();
  let dropped = entries.len() - products.len();

  let mut max_id = products.iter().map(|p| p.id).max().unwrap_or(0);
  let mut seen = HashSet::new();
  let mut renumbered = 0;
  for product in &mut products {
    if !seen.insert(product.id) {
      max_id = max_id.saturating_add(1);
      product.id = max_id;
      seen.insert(max_id);
      renumbered += 1;
    }
  }

  Sanitized {
    products,
    dropped,
    renumbered,
  }
}

/// Default file name for an export made on `date`.
pub fn export_file_name(date: NaiveDate) -> String {
  format!("mesproduits-export-{}.json", date.format("%Y-%m-%d"))
}
