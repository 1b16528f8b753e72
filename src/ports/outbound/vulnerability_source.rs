use crate::remediation::domain::{PackageId, VulnerabilityRecord};
use crate::shared::Result;
use async_trait::async_trait;

/// Advisories matched for one queried package, or the error text that
/// kept them from being read in full
pub type PackageAdvisories = std::result::Result<Vec<VulnerabilityRecord>, String>;

/// VulnerabilitySource port for advisory lookups
///
/// # Contract
/// `query_batch` returns exactly one entry per input, in input order.
/// `Ok(vec![])` means no advisory matched that package version. A package
/// whose matches could only be read partially is an `Err` entry, never a
/// shortened list.
#[async_trait]
pub trait VulnerabilitySource: Send + Sync {
    /// Largest batch the source accepts in one call
    fn max_batch_size(&self) -> usize;

    /// Fails as a whole only when the batch itself could not be queried
    async fn query_batch(&self, packages: &[PackageId]) -> Result<Vec<PackageAdvisories>>;
}
