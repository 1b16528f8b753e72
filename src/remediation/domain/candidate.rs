use super::{PackageName, PackageVersion};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DependencyType {
    Direct,
    Transitive,
}

impl DependencyType {
    pub fn from_is_direct(is_direct: bool) -> Self {
        if is_direct {
            DependencyType::Direct
        } else {
            DependencyType::Transitive
        }
    }
}

impl std::fmt::Display for DependencyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DependencyType::Direct => write!(f, "DIRECT"),
            DependencyType::Transitive => write!(f, "TRANSITIVE"),
        }
    }
}

/// Upgrade candidates for one vulnerable package, strictly ascending
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateRow {
    package: PackageName,
    current: PackageVersion,
    dependency_type: DependencyType,
    candidates: Vec<PackageVersion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_severity: Option<f32>,
}

impl CandidateRow {
    pub fn new(
        package: PackageName,
        current: PackageVersion,
        dependency_type: DependencyType,
        candidates: Vec<PackageVersion>,
        max_severity: Option<f32>,
    ) -> Self {
        Self {
            package,
            current,
            dependency_type,
            candidates,
            max_severity,
        }
    }

    pub fn package(&self) -> &PackageName {
        &self.package
    }

    pub fn current(&self) -> &PackageVersion {
        &self.current
    }

    pub fn dependency_type(&self) -> DependencyType {
        self.dependency_type
    }

    pub fn candidates(&self) -> &[PackageVersion] {
        &self.candidates
    }

    pub fn max_severity(&self) -> Option<f32> {
        self.max_severity
    }
}
