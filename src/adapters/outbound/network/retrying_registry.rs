use crate::ports::outbound::ReleaseRegistry;
use crate::remediation::domain::{PackageName, PackageVersion};
use crate::shared::{Result, RetryPolicy};
use async_trait::async_trait;

/// Applies a [`RetryPolicy`] to every release listing of the wrapped registry
pub struct RetryingReleaseRegistry<R: ReleaseRegistry> {
    inner: R,
    policy: RetryPolicy,
}

impl<R: ReleaseRegistry> RetryingReleaseRegistry<R> {
    pub fn new(inner: R, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<R: ReleaseRegistry> ReleaseRegistry for RetryingReleaseRegistry<R> {
    async fn list_releases(&self, name: &PackageName) -> Result<Vec<PackageVersion>> {
        let operation = format!("list releases of {}", name);
        self.policy
            .run(&operation, || self.inner.list_releases(name))
            .await
    }
}
