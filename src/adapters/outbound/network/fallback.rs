use crate::ports::outbound::{DeclaredDependency, DependencyMetadataSource};
use crate::remediation::domain::PackageId;
use crate::shared::Result;
use async_trait::async_trait;
use tracing::debug;

/// Consults `secondary` only when `primary` reports no dependencies.
///
/// Errors from the primary are returned as-is; the fallback is for missing
/// data, not for outages.
pub struct FallbackMetadataSource<P, S>
where
    P: DependencyMetadataSource,
    S: DependencyMetadataSource,
{
    primary: P,
    secondary: Option<S>,
}

impl<P, S> FallbackMetadataSource<P, S>
where
    P: DependencyMetadataSource,
    S: DependencyMetadataSource,
{
    pub fn new(primary: P, secondary: Option<S>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl<P, S> DependencyMetadataSource for FallbackMetadataSource<P, S>
where
    P: DependencyMetadataSource,
    S: DependencyMetadataSource,
{
    async fn declared_dependencies(&self, id: &PackageId) -> Result<Vec<DeclaredDependency>> {
        let declared = self.primary.declared_dependencies(id).await?;
        if !declared.is_empty() {
            return Ok(declared);
        }

        match &self.secondary {
            Some(secondary) => {
                debug!(package = %id, "Primary metadata empty, consulting fallback");
                secondary.declared_dependencies(id).await
            }
            None => Ok(declared),
        }
    }
}
