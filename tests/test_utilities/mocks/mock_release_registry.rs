use async_trait::async_trait;
use autoheal::prelude::*;
use std::collections::HashMap;

/// Mock ReleaseRegistry with a fixed release list per package
#[derive(Default)]
pub struct MockReleaseRegistry {
    releases: HashMap<String, Vec<String>>,
}

impl MockReleaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_releases(mut self, name: &str, versions: &[&str]) -> Self {
        self.releases.insert(
            name.to_string(),
            versions.iter().map(|v| v.to_string()).collect(),
        );
        self
    }
}

#[async_trait]
impl ReleaseRegistry for MockReleaseRegistry {
    async fn list_releases(&self, name: &PackageName) -> Result<Vec<PackageVersion>> {
        self.releases
            .get(name.as_str())
            .map(|versions| {
                versions
                    .iter()
                    .map(|v| PackageVersion::parse(v))
                    .collect::<Result<Vec<_>>>()
            })
            .unwrap_or_else(|| Ok(vec![]))
    }
}
