use async_trait::async_trait;
use autoheal::remediation::domain::{AffectedRange, RangeKind, VulnerabilityRecord};
use autoheal::prelude::*;
use std::collections::HashMap;

/// Mock VulnerabilitySource with advisories keyed by "name==version"
#[derive(Default)]
pub struct MockVulnerabilitySource {
    advisories: HashMap<String, Vec<VulnerabilityRecord>>,
    failures: HashMap<String, String>,
}

impl MockVulnerabilitySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an advisory affecting `package` that is fixed in each of `fixed`
    pub fn with_advisory(mut self, package: &str, id: &str, fixed: &[&str]) -> Self {
        let ranges = fixed
            .iter()
            .map(|f| AffectedRange::new(Some("0".to_string()), Some(f.to_string()), RangeKind::Ecosystem))
            .collect();
        self.advisories
            .entry(package.to_string())
            .or_default()
            .push(VulnerabilityRecord::new(
                id.to_string(),
                format!("{} summary", id),
                format!("https://osv.dev/vulnerability/{}", id),
                Some(7.5),
                ranges,
                vec![],
            ));
        self
    }

    /// Makes the lookup for `package` come back incomplete with `error`
    pub fn with_failure(mut self, package: &str, error: &str) -> Self {
        self.failures.insert(package.to_string(), error.to_string());
        self
    }
}

#[async_trait]
impl VulnerabilitySource for MockVulnerabilitySource {
    fn max_batch_size(&self) -> usize {
        1000
    }

    async fn query_batch(&self, packages: &[PackageId]) -> Result<Vec<PackageAdvisories>> {
        Ok(packages
            .iter()
            .map(|id| {
                let key = id.to_string();
                match self.failures.get(&key) {
                    Some(error) => Err(error.clone()),
                    None => Ok(self.advisories.get(&key).cloned().unwrap_or_default()),
                }
            })
            .collect())
    }
}
