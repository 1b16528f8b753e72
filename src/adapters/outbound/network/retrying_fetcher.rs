use crate::ports::outbound::MetadataFetcher;
use crate::remediation::domain::PackageId;
use crate::shared::{Result, RetryPolicy};
use async_trait::async_trait;

/// Applies a [`RetryPolicy`] to every fetch of the wrapped fetcher
pub struct RetryingFetcher<F: MetadataFetcher> {
    inner: F,
    policy: RetryPolicy,
}

impl<F: MetadataFetcher> RetryingFetcher<F> {
    pub fn new(inner: F, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<F: MetadataFetcher> MetadataFetcher for RetryingFetcher<F> {
    async fn fetch(&self, key: &PackageId) -> Result<serde_json::Value> {
        let operation = format!("fetch metadata for {}", key);
        self.policy.run(&operation, || self.inner.fetch(key)).await
    }
}
