use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use super::entity::{parse_catalog, Entity, ParseResult};
use crate::util::{validate_http_url, UrlValidationError};

/// Listing endpoint used when no `catalog_url` is configured.
pub const DEFAULT_CATALOG_URL: &str = "https://digimon-api.vercel.app/api/digimon";

const MAX_CATALOG_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while fetching the catalog.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// The configured endpoint is not an http(s) URL
    #[error("Invalid catalog URL: {0}")]
    InvalidUrl(#[from] UrlValidationError),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Body was not a JSON array
    #[error("Parse error: {0}")]
    Parse(String),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Received fewer bytes than Content-Length announced
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
    /// The fetch task panicked before reporting
    #[error("Catalog task failed: {0}")]
    TaskFailed(String),
}

/// Fetch and parse the full catalog with a single GET.
///
/// There is no pagination, retry or client-side timeout: the listing
/// service returns the whole collection in one response and failures are
/// reported as-is.
///
/// # Errors
///
/// - `FetchError::InvalidUrl` if `url` is not http(s)
/// - `FetchError::Network` / `HttpStatus` for transport and non-2xx failures
/// - `FetchError::ResponseTooLarge` / `IncompleteResponse` for bad bodies
/// - `FetchError::Parse` if the body is not a JSON array
pub async fn fetch_catalog(client: &reqwest::Client, url: &str) -> Result<Vec<Entity>, FetchError> {
    fetch_with_limit(client, url, MAX_CATALOG_SIZE).await
}

async fn fetch_with_limit(
    client: &reqwest::Client,
    url: &str,
    limit: usize,
) -> Result<Vec<Entity>, FetchError> {
    let url = validate_http_url(url)?;
    let response = client.get(url.clone()).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::HttpStatus(status.as_u16()));
    }

    let bytes = read_limited_bytes(response, limit).await?;
    let ParseResult { entities, skipped } =
        parse_catalog(&bytes).map_err(|e| FetchError::Parse(e.to_string()))?;

    if skipped > 0 {
        tracing::warn!(url = %url, skipped, "Malformed catalog entries skipped");
    }
    tracing::info!(url = %url, count = entities.len(), "Catalog fetched");

    Ok(entities)
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();
    if expected_length.is_some_and(|len| len > limit as u64) {
        return Err(FetchError::ResponseTooLarge);
    }

    let mut bytes = Vec::with_capacity(expected_length.map_or(0, |len| len as usize));
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}

// ============================================================================
// Catalog State
// ============================================================================

/// The loaded catalog and whether the load is still in flight.
///
/// Starts loading with an empty sequence. [`CatalogState::complete`] ends
/// loading for good; a failed fetch leaves the sequence empty, so "fetch
/// failed" and "loaded but empty" look the same to every reader.
#[derive(Debug)]
pub struct CatalogState {
    loading: bool,
    entities: Arc<Vec<Entity>>,
    by_name: HashMap<Arc<str>, usize>,
}

impl Default for CatalogState {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogState {
    pub fn new() -> Self {
        Self {
            loading: true,
            entities: Arc::new(Vec::new()),
            by_name: HashMap::new(),
        }
    }

    /// Record the outcome of the startup fetch.
    ///
    /// # Returns
    ///
    /// `false` if the catalog had already completed; the result is ignored.
    pub fn complete(&mut self, result: Result<Vec<Entity>, FetchError>) -> bool {
        if !self.loading {
            tracing::debug!("Catalog already loaded; ignoring late result");
            return false;
        }
        self.loading = false;
        match result {
            Ok(entities) => {
                self.by_name = entities
                    .iter()
                    .enumerate()
                    .map(|(i, e)| (Arc::clone(&e.name), i))
                    .collect();
                self.entities = Arc::new(entities);
            }
            Err(e) => tracing::warn!(error = %e, "Catalog fetch failed; continuing with an empty catalog"),
        }
        true
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Shared handle to the entities, in server response order.
    pub fn entities(&self) -> &Arc<Vec<Entity>> {
        &self.entities
    }

    /// Look up an entity by name.
    pub fn find(&self, name: &str) -> Option<&Entity> {
        self.by_name.get(name).map(|&i| &self.entities[i])
    }
}
