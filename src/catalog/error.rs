use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
  #[error("Invalid product: {0}")]
  InvalidProduct(&'static str),

  #[error("Invalid import format: expected a JSON array of products")]
  InvalidFormat,

  #[error("Import is not valid JSON: {0}")]
  Parse(#[from] serde_json::Error),

  #[error("Failed to save catalog: {0}")]
  Storage(color_eyre::Report),
}
