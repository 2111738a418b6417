//! The seam between the acquisition pipeline and a remote map source

use crate::client::TmxClient;
use crate::error::Result;
use crate::models::{MapDescriptor, SearchFilters};
use async_trait::async_trait;

/// A remote source of maps
///
/// [`TmxClient`] is the production implementation. The pipeline only holds
/// an `Arc<dyn MapExchange>`, so tests can substitute an in-memory source.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`.
#[async_trait]
pub trait MapExchange: Send + Sync {
    /// Random search: at most `desired_count` descriptors, none materialized
    async fn search(&self, filters: &SearchFilters, desired_count: usize)
    -> Result<Vec<MapDescriptor>>;

    /// Binary content of a single map
    async fn download(&self, external_id: u64) -> Result<Vec<u8>>;
}

#[async_trait]
impl MapExchange for TmxClient {
    async fn search(
        &self,
        filters: &SearchFilters,
        desired_count: usize,
    ) -> Result<Vec<MapDescriptor>> {
        self.search_maps(filters, desired_count).await
    }

    async fn download(&self, external_id: u64) -> Result<Vec<u8>> {
        self.download_map(external_id).await
    }
}
