use thiserror::Error;

/// Transport-level fetch failures.
#[derive(Error, Debug)]
pub enum FetchError {
  #[error("Request timed out: {0}")]
  Timeout(String),

  #[error("Could not connect: {0}")]
  Connect(String),

  #[error("Failed to read response body: {0}")]
  Body(String),

  #[error("Network error: {0}")]
  Other(String),
}

impl From<reqwest::Error> for FetchError {
  fn from(e: reqwest::Error) -> Self {
    if e.is_timeout() {
      FetchError::Timeout(e.to_string())
    } else if e.is_connect() {
      FetchError::Connect(e.to_string())
    } else if e.is_body() || e.is_decode() {
      FetchError::Body(e.to_string())
    } else {
      FetchError::Other(e.to_string())
    }
  }
}
