//! HTTP client for the trackmania.exchange map API
//!
//! This module provides a client for the two endpoints the session needs:
//! a filtered random search and the binary map download.
//!
//! # Example
//!
//! ```no_run
//! use ectmx::{SearchFilters, TmxClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = TmxClient::new()?;
//!
//!     let maps = client.search_maps(&SearchFilters::default(), 5).await?;
//!     for map in &maps {
//!         println!("{} by {}", map.name, map.author);
//!     }
//!
//!     if let Some(first) = maps.first() {
//!         let bytes = client.download_map(first.external_id).await?;
//!         println!("Downloaded {} bytes", bytes.len());
//!     }
//!
//!     Ok(())
//! }
//! ```

use crate::error::{Error, Result};
use crate::models::{MapDescriptor, SearchFilters, SearchResponse, SearchResult};
use rand::Rng;
use rand::seq::SliceRandom;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Default map exchange base URL
pub const DEFAULT_BASE_URL: &str = "https://trackmania.exchange";

/// Search endpoint, relative to the base URL
pub const SEARCH_PATH: &str = "/mapsearch2/search";

/// Download endpoint prefix, relative to the base URL
pub const DOWNLOAD_PATH: &str = "/maps/download";

/// Default timeout for HTTP requests (30 seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default User-Agent
pub const DEFAULT_USER_AGENT: &str = "ElimChamber/0.1 (ectmx)";

/// How many results are requested per wanted map
const OVERFETCH_FACTOR: usize = 2;

/// trackmania.exchange HTTP client
///
/// The client is stateless: it holds configuration only and never caches
/// responses. Randomization happens client-side, so successive searches may
/// return the same map twice; deduplication is the caller's job.
#[derive(Debug, Clone)]
pub struct TmxClient {
    pub(crate) client: Client,
    base_url: String,
    timeout: Duration,
}

impl TmxClient {
    /// Create a new client with default settings
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a builder for configuring the client
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the per-request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    // ========================================================================
    // Search
    // ========================================================================

    /// Build the search URL for a random query returning at most `limit` maps
    pub fn search_url(&self, filters: &SearchFilters, limit: usize) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, SEARCH_PATH))?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in filters.query_pairs(limit) {
                query.append_pair(key, &value);
            }
        }
        Ok(url)
    }

    /// Search random maps matching `filters`
    ///
    /// Requests twice as many results as wanted, shuffles them locally and
    /// keeps the first `desired_count`. Zero results is a valid, empty answer.
    ///
    /// # Errors
    ///
    /// - [`Error::RemoteUnavailable`] on transport error, timeout or non-2xx status
    /// - [`Error::InvalidResponse`] when the payload is not JSON or has no `results`
    pub async fn search_maps(
        &self,
        filters: &SearchFilters,
        desired_count: usize,
    ) -> Result<Vec<MapDescriptor>> {
        if desired_count == 0 {
            return Ok(Vec::new());
        }
        filters.validate()?;

        let url = self.search_url(filters, desired_count * OVERFETCH_FACTOR)?;
        info!(%url, "Searching map exchange");

        let response = self.client.get(url).timeout(self.timeout).send().await?;

        if !response.status().is_success() {
            return Err(Error::RemoteUnavailable(format!(
                "search returned status: {}",
                response.status()
            )));
        }

        let body = response.bytes().await?;
        let parsed: SearchResponse = serde_json::from_slice(&body)
            .map_err(|e| Error::invalid_response(format!("search payload: {}", e)))?;

        let selected = pick_random(parsed.results, desired_count, &mut rand::rng());
        debug!(count = selected.len(), "Selected maps from search results");

        Ok(selected)
    }

    // ========================================================================
    // Download
    // ========================================================================

    /// URL of the binary download for a map
    pub fn download_url(&self, external_id: u64) -> String {
        format!("{}{}/{}", self.base_url, DOWNLOAD_PATH, external_id)
    }

    /// Fetch the binary map file for `external_id`
    ///
    /// Only HTTP 200 is accepted. The request is bounded by the client
    /// timeout; a timeout is reported like any other transport failure.
    pub async fn download_map(&self, external_id: u64) -> Result<Vec<u8>> {
        let url = self.download_url(external_id);
        debug!(tmx_id = external_id, %url, "Downloading map");

        let response = self.client.get(&url).timeout(self.timeout).send().await?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(Error::RemoteUnavailable(format!(
                "download of {} returned status: {}",
                external_id,
                response.status()
            )));
        }

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}

/// Shuffle search hits and keep the first `count` as descriptors
pub fn pick_random<R: Rng + ?Sized>(
    mut results: Vec<SearchResult>,
    count: usize,
    rng: &mut R,
) -> Vec<MapDescriptor> {
    results.shuffle(rng);
    results
        .into_iter()
        .take(count)
        .map(MapDescriptor::from)
        .collect()
}

/// Builder for configuring a TmxClient
#[derive(Debug)]
pub struct ClientBuilder {
    base_url: String,
    timeout: Duration,
    user_agent: String,
    proxy: Option<String>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            proxy: None,
        }
    }
}

impl ClientBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL (trailing slashes are removed)
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set a proxy URL
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Build the client
    pub fn build(self) -> Result<TmxClient> {
        let mut builder = Client::builder()
            .user_agent(&self.user_agent)
            .timeout(self.timeout);

        if let Some(proxy_url) = &self.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| Error::Config(anyhow::anyhow!("Invalid proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        Ok(TmxClient {
            client: builder.build()?,
            base_url: self.base_url,
            timeout: self.timeout,
        })
    }
}
