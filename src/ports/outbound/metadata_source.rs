use crate::remediation::domain::{PackageId, PackageName, PackageVersion};
use crate::shared::Result;
use async_trait::async_trait;

/// How a dependency's version is declared upstream
#[derive(Debug, Clone, PartialEq)]
pub enum DeclaredRequirement {
    /// A concrete version, usable as-is
    Exact(PackageVersion),
    /// A PEP 440 specifier set that still needs resolving
    Constraint(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredDependency {
    pub name: PackageName,
    pub requirement: DeclaredRequirement,
}

impl DeclaredDependency {
    pub fn exact(name: PackageName, version: PackageVersion) -> Self {
        Self {
            name,
            requirement: DeclaredRequirement::Exact(version),
        }
    }

    pub fn constraint(name: PackageName, constraint: impl Into<String>) -> Self {
        Self {
            name,
            requirement: DeclaredRequirement::Constraint(constraint.into()),
        }
    }
}

/// MetadataFetcher port: raw payload lookup keyed by (name, version)
///
/// This is the seam where disk caching and retries are layered. A payload
/// for a package the service does not know is an empty JSON object, never
/// an error.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    async fn fetch(&self, key: &PackageId) -> Result<serde_json::Value>;
}

/// DependencyMetadataSource port for the declared dependencies of a release
#[async_trait]
pub trait DependencyMetadataSource: Send + Sync {
    /// Returns the direct dependencies `id` declares. Unknown packages
    /// yield an empty list.
    async fn declared_dependencies(&self, id: &PackageId) -> Result<Vec<DeclaredDependency>>;
}
