use crate::ports::outbound::ReleaseRegistry;
use crate::remediation::domain::{PackageName, PackageVersion};
use crate::shared::error::RemediationError;
use crate::shared::Result;
use dashmap::DashMap;
use pep440_rs::VersionSpecifiers;
use std::str::FromStr;
use tracing::debug;

/// Resolves a constraint to the highest satisfying published release.
///
/// Results, including "nothing satisfies", are memoized per
/// (name, constraint) for the lifetime of the resolver. Registry failures
/// are not memoized so a later call can retry.
pub struct VersionResolver<R: ReleaseRegistry> {
    registry: R,
    memo: DashMap<(PackageName, String), Option<PackageVersion>>,
}

impl<R: ReleaseRegistry> VersionResolver<R> {
    pub fn new(registry: R) -> Self {
        Self {
            registry,
            memo: DashMap::new(),
        }
    }

    /// # Errors
    /// - `Validation` when the constraint is not a PEP 440 specifier set
    /// - `Resolution` when no release satisfies it
    /// - whatever the registry raises for lookup failures
    pub async fn resolve(&self, name: &PackageName, constraint: &str) -> Result<PackageVersion> {
        let constraint = constraint.trim();
        let key = (name.clone(), constraint.to_string());

        let cached = self.memo.get(&key).map(|entry| entry.value().clone());
        let resolved = match cached {
            Some(cached) => cached,
            None => {
                let specifiers = parse_specifiers(constraint)?;
                let releases = self.registry.list_releases(name).await?;
                let resolved = select_highest(&releases, specifiers.as_ref());
                debug!(
                    package = %name,
                    constraint,
                    resolved = ?resolved.as_ref().map(PackageVersion::as_str),
                    "Resolved constraint"
                );
                self.memo.insert(key, resolved.clone());
                resolved
            }
        };

        resolved.ok_or_else(|| {
            RemediationError::Resolution {
                package: name.to_string(),
                constraint: if constraint.is_empty() {
                    "*".to_string()
                } else {
                    constraint.to_string()
                },
            }
            .into()
        })
    }

    #[cfg(test)]
    pub fn memo_size(&self) -> usize {
        self.memo.len()
    }
}

/// An empty constraint parses to `None`, meaning "any release"
pub fn parse_specifiers(constraint: &str) -> Result<Option<VersionSpecifiers>> {
    if constraint.trim().is_empty() {
        return Ok(None);
    }
    VersionSpecifiers::from_str(constraint).map(Some).map_err(|e| {
        RemediationError::Validation {
            message: format!("'{}' is not a valid version constraint: {}", constraint, e),
        }
        .into()
    })
}

/// Picks the highest release allowed by `specifiers`.
///
/// Pre-releases are only eligible when the constraint names one, or when no
/// final release satisfies it.
pub fn select_highest(
    releases: &[PackageVersion],
    specifiers: Option<&VersionSpecifiers>,
) -> Option<PackageVersion> {
    let matching: Vec<&PackageVersion> = releases
        .iter()
        .filter(|v| specifiers.map_or(true, |s| s.contains(v.pep440())))
        .collect();

    let mentions_prerelease =
        specifiers.is_some_and(|s| s.iter().any(|spec| spec.version().any_prerelease()));

    let highest = matching.iter().max().copied();
    let best = if mentions_prerelease {
        highest
    } else {
        matching
            .iter()
            .filter(|v| !v.is_prerelease())
            .max()
            .copied()
            .or(highest)
    };
    best.cloned()
}
