use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  /// Creation time in milliseconds, unique within the catalog
  pub id: i64,
  pub name: String,
  pub price: f64,
  #[serde(default)]
  pub category: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<DateTime<Utc>>,
}

impl Product {
  /// Build a product from an untrusted JSON value.
  ///
  /// Entries without a non-empty `name` or without a numeric `price` (a
  /// number or a numeric string) are rejected. A missing `id` is replaced
  /// with `fallback_id`; other missing fields get empty defaults.
  pub fn from_untrusted(value: &Value, fallback_id: i64) -> Option<Self> {
    let object = value.as_object()?;

    let name = object.get("name")?.as_str()?.trim();
    if name.is_empty() {
      return None;
    }

    let price = match object.get("price")? {
      Value::Number(n) => n.as_f64()?,
      Value::String(s) => s.trim().parse::<f64>().ok()?,
      _ => return None,
    };
    if !price.is_finite() {
      return None;
    }

    let id = object
      .get("id")
      .and_then(Value::as_i64)
      .unwrap_or(fallback_id);
    let category = object
      .get("category")
      .and_then(Value::as_str)
      .unwrap_or_default()
      .to_string();
    let created_at = object
      .get("createdAt")
      .and_then(Value::as_str)
      .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
      .map(|dt| dt.with_timezone(&Utc));

    Some(Self {
      id,
      name: name.to_string(),
      price,
      category,
      created_at,
    })
  }

  /// Category label for display.
  pub fn category_label(&self) -> &str {
    if self.category.is_empty() {
      "Uncategorized"
    } else {
      &self.category
    }
  }
}
