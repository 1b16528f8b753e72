use async_trait::async_trait;
use autoheal::ports::outbound::DeclaredDependency;
use autoheal::prelude::*;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Dependency table keyed by "name==version"; values are (name, requirement)
type Table = HashMap<String, Vec<(String, String)>>;

/// Mock DependencyMetadataSource that counts lookups
#[derive(Default, Clone)]
pub struct MockMetadataSource {
    table: Table,
    pub calls: Arc<AtomicUsize>,
}

impl MockMetadataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// `requirement` is an exact version ("2.0.1") or a constraint (">=2.0")
    pub fn with_dependency(mut self, package: &str, dependency: &str, requirement: &str) -> Self {
        self.table
            .entry(package.to_string())
            .or_default()
            .push((dependency.to_string(), requirement.to_string()));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DependencyMetadataSource for MockMetadataSource {
    async fn declared_dependencies(&self, id: &PackageId) -> Result<Vec<DeclaredDependency>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let Some(deps) = self.table.get(&id.to_string()) else {
            return Ok(vec![]);
        };
        deps.iter()
            .map(|(name, requirement)| {
                let name = PackageName::new(name)?;
                Ok(match PackageVersion::try_parse(requirement) {
                    Some(version) => DeclaredDependency::exact(name, version),
                    None => DeclaredDependency::constraint(name, requirement.as_str()),
                })
            })
            .collect()
    }
}

/// Mock MetadataFetcher counting every remote call. Payloads use the
/// deps.dev flat shape, or the PyPI release shape when built with `pypi()`.
#[derive(Default, Clone)]
pub struct MockMetadataFetcher {
    table: Table,
    pypi_shape: bool,
    pub calls: Arc<AtomicUsize>,
}

impl MockMetadataFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pypi() -> Self {
        Self {
            pypi_shape: true,
            ..Self::default()
        }
    }

    pub fn with_dependency(mut self, package: &str, dependency: &str, version: &str) -> Self {
        self.table
            .entry(package.to_string())
            .or_default()
            .push((dependency.to_string(), version.to_string()));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataFetcher for MockMetadataFetcher {
    async fn fetch(&self, key: &PackageId) -> Result<serde_json::Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let declared = self.table.get(&key.to_string()).into_iter().flatten();

        if self.pypi_shape {
            let requires_dist: Vec<String> = declared
                .map(|(name, version)| format!("{}=={}", name, version))
                .collect();
            return Ok(json!({
                "info": {"name": key.name().as_str(), "requires_dist": requires_dist}
            }));
        }

        let dependencies: Vec<serde_json::Value> = declared
            .map(|(name, version)| json!({"package": {"name": name}, "version": version}))
            .collect();
        Ok(json!({ "dependencies": dependencies }))
    }
}
