use super::http::{self, DEFAULT_TIMEOUT_SECS};
use crate::ports::outbound::{
    DeclaredDependency, DependencyMetadataSource, MetadataFetcher, ReleaseRegistry,
};
use crate::remediation::domain::{PackageId, PackageName, PackageVersion};
use crate::remediation::services::marker::mentions_extra;
use crate::remediation::services::{ManifestParser, MarkerEnvironment, VersionSpec};
use crate::shared::error::RemediationError;
use crate::shared::security::validate_path_component;
use crate::shared::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

const SERVICE: &str = "PyPI";

#[derive(Debug, Deserialize)]
struct PyPiProject {
    #[serde(default)]
    releases: HashMap<String, Vec<PyPiFile>>,
}

#[derive(Debug, Deserialize)]
struct PyPiFile {
    #[serde(default)]
    yanked: bool,
}

#[derive(Debug, Deserialize)]
struct PyPiRelease {
    info: PyPiInfo,
}

#[derive(Debug, Deserialize)]
struct PyPiInfo {
    #[serde(default)]
    requires_dist: Option<Vec<String>>,
}

/// PyPiClient adapter for the PyPI JSON API
///
/// Serves the release listing used for constraint resolution, and the raw
/// per-release payload that [`PyPiDependencySource`] reads `requires_dist`
/// from.
pub struct PyPiClient {
    client: reqwest::Client,
    base_url: String,
}

impl PyPiClient {
    pub const BASE_URL: &'static str = "https://pypi.org";
    /// Disk cache namespace for release payloads
    pub const CACHE_NAMESPACE: &'static str = "pypi";

    /// Creates a client against pypi.org with the default timeout
    pub fn new() -> Result<Self> {
        Self::with_base_url(Self::BASE_URL, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http::build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn project_url(&self, name: &PackageName) -> Result<String> {
        validate_path_component(name.as_str(), "Package name")?;
        Ok(format!(
            "{}/pypi/{}/json",
            self.base_url,
            urlencoding::encode(name.as_str())
        ))
    }

    fn release_url(&self, id: &PackageId) -> Result<String> {
        validate_path_component(id.name().as_str(), "Package name")?;
        validate_path_component(id.version().as_str(), "Version")?;
        Ok(format!(
            "{}/pypi/{}/{}/json",
            self.base_url,
            urlencoding::encode(id.name().as_str()),
            urlencoding::encode(id.version().as_str())
        ))
    }
}

/// Keeps releases that have at least one file and are not entirely yanked
fn available_releases(project: PyPiProject) -> Vec<PackageVersion> {
    project
        .releases
        .into_iter()
        .filter(|(_, files)| !files.is_empty() && files.iter().any(|f| !f.yanked))
        .filter_map(|(version, _)| PackageVersion::try_parse(&version))
        .collect()
}

#[async_trait]
impl ReleaseRegistry for PyPiClient {
    async fn list_releases(&self, name: &PackageName) -> Result<Vec<PackageVersion>> {
        let url = self.project_url(name)?;
        let project: Option<PyPiProject> = http::get_json(&self.client, SERVICE, &url).await?;

        let releases = project.map(available_releases).unwrap_or_default();
        debug!(package = %name, count = releases.len(), "Fetched release list");
        Ok(releases)
    }
}

#[async_trait]
impl MetadataFetcher for PyPiClient {
    async fn fetch(&self, key: &PackageId) -> Result<serde_json::Value> {
        let url = self.release_url(key)?;
        let payload: Option<serde_json::Value> =
            http::get_json(&self.client, SERVICE, &url).await?;
        if payload.is_none() {
            debug!(package = %key, "PyPI has no such release");
        }
        Ok(payload.unwrap_or_else(|| serde_json::json!({})))
    }
}

/// Reads declared dependencies from PyPI release payloads.
///
/// Payloads come through any [`MetadataFetcher`], so the same disk cache
/// and retry layers used for deps.dev apply here.
pub struct PyPiDependencySource<F: MetadataFetcher> {
    fetcher: F,
    environment: MarkerEnvironment,
}

impl<F: MetadataFetcher> PyPiDependencySource<F> {
    pub fn new(fetcher: F, environment: MarkerEnvironment) -> Self {
        Self {
            fetcher,
            environment,
        }
    }

    /// Extracts `requires_dist` from a release payload.
    ///
    /// # Errors
    /// Returns a `DataFormat` error when a non-empty payload has no usable
    /// `info` object.
    fn parse_payload(&self, id: &PackageId, payload: &serde_json::Value) -> Result<Vec<DeclaredDependency>> {
        let is_empty_object = payload.as_object().is_some_and(|o| o.is_empty());
        if payload.is_null() || is_empty_object {
            return Ok(Vec::new());
        }

        let release: PyPiRelease =
            serde_json::from_value(payload.clone()).map_err(|e| RemediationError::DataFormat {
                service: SERVICE.to_string(),
                details: format!("{}: {}", id, e),
            })?;

        Ok(release
            .info
            .requires_dist
            .unwrap_or_default()
            .iter()
            .filter_map(|entry| self.declared_from_requires_dist(entry))
            .collect())
    }

    /// Turns one `requires_dist` entry into a declared dependency.
    ///
    /// Returns `None` for optional (extra-gated) entries, entries whose
    /// marker does not apply, and entries that cannot be parsed.
    fn declared_from_requires_dist(&self, entry: &str) -> Option<DeclaredDependency> {
        let requirement = match ManifestParser::parse_requirement(entry) {
            Ok(requirement) => requirement,
            Err(e) => {
                warn!(entry, error = %e, "Skipping unparseable requires_dist entry");
                return None;
            }
        };

        if let Some(marker) = requirement.marker.as_deref() {
            if mentions_extra(marker) {
                return None;
            }
            match self.environment.evaluate(marker) {
                Ok(true) => {}
                Ok(false) => return None,
                Err(e) => {
                    warn!(entry, error = %e, "Skipping requires_dist entry with unreadable marker");
                    return None;
                }
            }
        }

        Some(match requirement.spec {
            VersionSpec::Pinned(version) => match PackageVersion::try_parse(&version) {
                Some(version) => DeclaredDependency::exact(requirement.name, version),
                None => DeclaredDependency::constraint(requirement.name, format!("=={}", version)),
            },
            VersionSpec::Constraint(constraint) => {
                DeclaredDependency::constraint(requirement.name, constraint)
            }
        })
    }
}

#[async_trait]
impl<F: MetadataFetcher> DependencyMetadataSource for PyPiDependencySource<F> {
    async fn declared_dependencies(&self, id: &PackageId) -> Result<Vec<DeclaredDependency>> {
        let payload = self.fetcher.fetch(id).await?;
        self.parse_payload(id, &payload)
    }
}
