use crate::ports::outbound::ReleaseRegistry;
use crate::remediation::domain::{PackageName, PackageVersion};
use crate::shared::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// CachingReleaseRegistry wraps a ReleaseRegistry and adds in-memory caching.
///
/// Release lists are fetched at most once per package for the lifetime of
/// the wrapper. Failed lookups are not cached.
pub struct CachingReleaseRegistry<R: ReleaseRegistry> {
    inner: R,
    cache: Arc<DashMap<PackageName, Vec<PackageVersion>>>,
}

impl<R: ReleaseRegistry> CachingReleaseRegistry<R> {
    /// Creates a new caching registry wrapping the given inner registry
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cache: Arc::new(DashMap::new()),
        }
    }

    /// Returns the current cache size (for testing/monitoring)
    #[cfg(test)]
    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }
}

#[async_trait]
impl<R: ReleaseRegistry> ReleaseRegistry for CachingReleaseRegistry<R> {
    async fn list_releases(&self, name: &PackageName) -> Result<Vec<PackageVersion>> {
        let cached = self.cache.get(name).map(|entry| entry.value().clone());
        if let Some(releases) = cached {
            return Ok(releases);
        }

        let releases = self.inner.list_releases(name).await?;
        self.cache.insert(name.clone(), releases.clone());
        Ok(releases)
    }
}
