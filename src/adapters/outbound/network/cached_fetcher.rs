use crate::adapters::outbound::filesystem::DiskCache;
use crate::ports::outbound::MetadataFetcher;
use crate::remediation::domain::PackageId;
use crate::shared::Result;
use async_trait::async_trait;
use tracing::warn;

/// Fetch-through disk cache in front of any [`MetadataFetcher`].
///
/// A cached payload is returned without calling the inner fetcher. Failed
/// fetches are never written, and a failed cache write does not fail the
/// lookup.
pub struct CachedFetcher<F: MetadataFetcher> {
    inner: F,
    cache: DiskCache,
}

impl<F: MetadataFetcher> CachedFetcher<F> {
    pub fn new(inner: F, cache: DiskCache) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl<F: MetadataFetcher> MetadataFetcher for CachedFetcher<F> {
    async fn fetch(&self, key: &PackageId) -> Result<serde_json::Value> {
        if let Some(hit) = self.cache.get(key) {
            return Ok(hit);
        }

        let payload = self.inner.fetch(key).await?;
        if let Err(e) = self.cache.put(key, &payload) {
            warn!(package = %key, error = %e, "Failed to write cache entry");
        }
        Ok(payload)
    }
}
