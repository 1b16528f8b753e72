use super::http::{self, DEFAULT_TIMEOUT_SECS};
use crate::ports::outbound::{DeclaredDependency, DependencyMetadataSource, MetadataFetcher};
use crate::remediation::domain::{PackageId, PackageName, PackageVersion};
use crate::shared::error::RemediationError;
use crate::shared::security::validate_path_component;
use crate::shared::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const SERVICE: &str = "deps.dev";

/// DepsDevClient adapter for the deps.dev dependency endpoint
///
/// Returns the raw JSON payload; interpretation happens in
/// [`DepsDevDependencySource`] so that caching and retries can be layered
/// between the two.
pub struct DepsDevClient {
    client: reqwest::Client,
    base_url: String,
}

impl DepsDevClient {
    pub const BASE_URL: &'static str = "https://api.deps.dev/v3alpha";

    pub fn new() -> Result<Self> {
        Self::with_base_url(Self::BASE_URL, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http::build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn dependencies_url(&self, key: &PackageId) -> Result<String> {
        validate_path_component(key.name().as_str(), "Package name")?;
        validate_path_component(key.version().as_str(), "Version")?;
        Ok(format!(
            "{}/systems/pypi/packages/{}/versions/{}:dependencies",
            self.base_url,
            urlencoding::encode(key.name().as_str()),
            urlencoding::encode(key.version().as_str())
        ))
    }
}

#[async_trait]
impl MetadataFetcher for DepsDevClient {
    async fn fetch(&self, key: &PackageId) -> Result<serde_json::Value> {
        let url = self.dependencies_url(key)?;
        let payload: Option<serde_json::Value> =
            http::get_json(&self.client, SERVICE, &url).await?;
        if payload.is_none() {
            debug!(package = %key, "deps.dev has no record");
        }
        Ok(payload.unwrap_or_else(|| serde_json::json!({})))
    }
}

// deps.dev response structures

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphPayload {
    nodes: Vec<GraphNode>,
    #[serde(default)]
    edges: Vec<GraphEdge>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphNode {
    version_key: VersionKey,
    #[serde(default)]
    relation: String,
}

#[derive(Debug, Deserialize)]
struct VersionKey {
    name: String,
    #[serde(default)]
    version: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphEdge {
    from_node: usize,
    to_node: usize,
    #[serde(default)]
    requirement: String,
}

#[derive(Debug, Deserialize)]
struct FlatPayload {
    #[serde(default)]
    dependencies: Vec<FlatDependency>,
}

#[derive(Debug, Deserialize)]
struct FlatDependency {
    package: FlatPackage,
    #[serde(default)]
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FlatPackage {
    name: String,
}

/// Interprets deps.dev payloads obtained through any [`MetadataFetcher`].
pub struct DepsDevDependencySource<F: MetadataFetcher> {
    fetcher: F,
}

impl<F: MetadataFetcher> DepsDevDependencySource<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    /// Extracts the direct dependencies of `id` from either payload shape.
    ///
    /// # Errors
    /// Returns a `DataFormat` error when the payload matches neither shape.
    pub fn parse_payload(id: &PackageId, payload: &serde_json::Value) -> Result<Vec<DeclaredDependency>> {
        let is_empty_object = payload.as_object().is_some_and(|o| o.is_empty());
        if payload.is_null() || is_empty_object {
            return Ok(Vec::new());
        }

        if payload.get("nodes").is_some() {
            let graph: GraphPayload = serde_json::from_value(payload.clone())
                .map_err(|e| data_format(id, e.to_string()))?;
            return Ok(from_graph(id, graph));
        }

        if payload.get("dependencies").is_some() {
            let flat: FlatPayload = serde_json::from_value(payload.clone())
                .map_err(|e| data_format(id, e.to_string()))?;
            return Ok(from_flat(id, flat));
        }

        Err(data_format(id, "payload has neither 'nodes' nor 'dependencies'".to_string()))
    }
}

fn data_format(id: &PackageId, details: String) -> anyhow::Error {
    RemediationError::DataFormat {
        service: SERVICE.to_string(),
        details: format!("{}: {}", id, details),
    }
    .into()
}

fn from_graph(id: &PackageId, graph: GraphPayload) -> Vec<DeclaredDependency> {
    let self_index = graph
        .nodes
        .iter()
        .position(|n| n.relation.eq_ignore_ascii_case("SELF"))
        .unwrap_or(0);

    graph
        .edges
        .iter()
        .filter(|edge| edge.from_node == self_index)
        .filter_map(|edge| {
            let Some(target) = graph.nodes.get(edge.to_node) else {
                warn!(package = %id, node = edge.to_node, "Edge points outside the node list");
                return None;
            };
            let name = match PackageName::new(&target.version_key.name) {
                Ok(name) => name,
                Err(e) => {
                    warn!(package = %id, error = %e, "Skipping dependency with invalid name");
                    return None;
                }
            };
            match PackageVersion::try_parse(&target.version_key.version) {
                Some(version) => Some(DeclaredDependency::exact(name, version)),
                None => Some(DeclaredDependency::constraint(name, edge.requirement.trim())),
            }
        })
        .collect()
}

fn from_flat(id: &PackageId, flat: FlatPayload) -> Vec<DeclaredDependency> {
    flat.dependencies
        .into_iter()
        .filter_map(|dep| {
            let name = match PackageName::new(&dep.package.name) {
                Ok(name) => name,
                Err(e) => {
                    warn!(package = %id, error = %e, "Skipping dependency with invalid name");
                    return None;
                }
            };
            let raw = dep.version.unwrap_or_default();
            if raw.trim().is_empty() {
                debug!(package = %id, dependency = %name, "Skipping unversioned dependency");
                return None;
            }
            match PackageVersion::try_parse(raw.trim()) {
                Some(version) => Some(DeclaredDependency::exact(name, version)),
                None => Some(DeclaredDependency::constraint(name, raw.trim())),
            }
        })
        .collect()
}

#[async_trait]
impl<F: MetadataFetcher> DependencyMetadataSource for DepsDevDependencySource<F> {
    async fn declared_dependencies(&self, id: &PackageId) -> Result<Vec<DeclaredDependency>> {
        let payload = self.fetcher.fetch(id).await?;
        Self::parse_payload(id, &payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::outbound::DeclaredRequirement;
    use serde_json::json;

    struct StaticFetcher(serde_json::Value);

    #[async_trait]
    impl MetadataFetcher for StaticFetcher {
        async fn fetch(&self, _key: &PackageId) -> Result<serde_json::Value> {
            Ok(self.0.clone())
        }
    }

    fn id() -> PackageId {
        PackageId::new(
            PackageName::new("requests").unwrap(),
            PackageVersion::parse("2.31.0").unwrap(),
        )
    }

    #[test]
    fn test_depsdev_client_creation() {
        assert!(DepsDevClient::new().is_ok());
    }

    #[test]
    fn test_dependencies_url() {
        let client = DepsDevClient::new().unwrap();
        assert_eq!(
            client.dependencies_url(&id()).unwrap(),
            "https://api.deps.dev/v3alpha/systems/pypi/packages/requests/versions/2.31.0:dependencies"
        );
    }

    #[test]
    fn test_graph_shape_reads_direct_edges_only() {
        let payload = json!({
            "nodes": [
                {"versionKey": {"system": "PYPI", "name": "requests", "version": "2.31.0"}, "relation": "SELF"},
                {"versionKey": {"system": "PYPI", "name": "urllib3", "version": "2.0.7"}, "relation": "DIRECT"},
                {"versionKey": {"system": "PYPI", "name": "idna", "version": ""}, "relation": "DIRECT"},
                {"versionKey": {"system": "PYPI", "name": "certifi", "version": "2023.7.22"}, "relation": "INDIRECT"}
            ],
            "edges": [
                {"fromNode": 0, "toNode": 1, "requirement": ">=1.21.1,<3"},
                {"fromNode": 0, "toNode": 2, "requirement": ">=2.5,<4"},
                {"fromNode": 1, "toNode": 3, "requirement": ">=2017.4.17"}
            ]
        });

        let deps = DepsDevDependencySource::<StaticFetcher>::parse_payload(&id(), &payload).unwrap();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].name.as_str(), "urllib3");
        assert_eq!(
            deps[0].requirement,
            DeclaredRequirement::Exact(PackageVersion::parse("2.0.7").unwrap())
        );
        assert_eq!(
            deps[1].requirement,
            DeclaredRequirement::Constraint(">=2.5,<4".to_string())
        );
    }

    #[test]
    fn test_flat_shape_skips_unversioned() {
        let payload = json!({
            "dependencies": [
                {"package": {"name": "Charset_Normalizer"}, "version": "3.3.2"},
                {"package": {"name": "pysocks"}, "version": ""}
            ]
        });

        let deps = DepsDevDependencySource::<StaticFetcher>::parse_payload(&id(), &payload).unwrap();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].name.as_str(), "charset-normalizer");
    }

    #[test]
    fn test_empty_payload_means_no_dependencies() {
        let deps = DepsDevDependencySource::<StaticFetcher>::parse_payload(&id(), &json!({})).unwrap();
        assert!(deps.is_empty());
    }

    #[test]
    fn test_unknown_shape_is_data_format_error() {
        let err = DepsDevDependencySource::<StaticFetcher>::parse_payload(&id(), &json!({"oops": 1}))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RemediationError>(),
            Some(RemediationError::DataFormat { .. })
        ));
    }

    #[tokio::test]
    async fn test_source_reads_through_fetcher() {
        let source = DepsDevDependencySource::new(StaticFetcher(json!({
            "dependencies": [{"package": {"name": "idna"}, "version": "3.4"}]
        })));
        let deps = source.declared_dependencies(&id()).await.unwrap();
        assert_eq!(deps.len(), 1);
    }
}
