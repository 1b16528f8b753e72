use crate::remediation::domain::{PackageName, PackageVersion};
use crate::shared::Result;
use async_trait::async_trait;

/// ReleaseRegistry port for listing published releases of a package
///
/// Used by constraint resolution. Implementations must be `Send + Sync`.
#[async_trait]
pub trait ReleaseRegistry: Send + Sync {
    /// Returns every installable release of `name`, in no particular order.
    ///
    /// Release strings that are not valid PEP 440 versions are omitted.
    /// An unknown package yields an empty list.
    async fn list_releases(&self, name: &PackageName) -> Result<Vec<PackageVersion>>;
}
