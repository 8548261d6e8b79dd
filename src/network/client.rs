use color_eyre::{eyre::eyre, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::{FetchError, Fetcher, Request};
use crate::cache::CachedResponse;
use crate::config::NetworkConfig;

/// HTTP fetcher backed by reqwest.
/// Clone is cheap, the underlying client shares its connection pool.
#[derive(Clone)]
pub struct HttpFetcher {
  client: Client,
}

impl HttpFetcher {
  pub fn new(config: &NetworkConfig) -> Result<Self> {
    let mut builder = Client::builder().user_agent(concat!(
      env!("CARGO_PKG_NAME"),
      "/",
      env!("CARGO_PKG_VERSION")
    ));

    if let Some(secs) = config.timeout_secs {
      builder = builder.timeout(Duration::from_secs(secs));
    }

    let client = builder
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client })
  }
}

impl Fetcher for HttpFetcher {
  async fn fetch(&self, request: &Request) -> Result<CachedResponse, FetchError> {
    let response = self
      .client
      .request(request.method.clone(), request.url.clone())
      .headers(request.headers.clone())
      .send()
      .await?;

    let status = response.status().as_u16();
    let headers = response
      .headers()
      .iter()
      .map(|(name, value)| {
        (
          name.as_str().to_string(),
          String::from_utf8_lossy(value.as_bytes()).into_owned(),
        )
      })
      .collect();

    // Buffer the whole body so a dropped request never stores a partial one
    let body = response.bytes().await?;

    debug!(url = %request.url, status, bytes = body.len(), "fetched");

    Ok(CachedResponse::new(status, headers, body.to_vec()))
  }
}
