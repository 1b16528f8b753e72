use super::{DependencyType, PackageName, PackageVersion};
use serde::Serialize;

/// One chosen target version for a vulnerable package
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixSelection {
    package: PackageName,
    current: PackageVersion,
    chosen: PackageVersion,
    rationale: String,
}

impl FixSelection {
    pub fn new(
        package: PackageName,
        current: PackageVersion,
        chosen: PackageVersion,
        rationale: String,
    ) -> Self {
        Self {
            package,
            current,
            chosen,
            rationale,
        }
    }

    pub fn package(&self) -> &PackageName {
        &self.package
    }

    pub fn current(&self) -> &PackageVersion {
        &self.current
    }

    pub fn chosen(&self) -> &PackageVersion {
        &self.chosen
    }

    pub fn rationale(&self) -> &str {
        &self.rationale
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FixDecision {
    Selected(FixSelection),
    NoAcceptableFix { reason: String },
}

/// Result of trialing one selection against the baseline
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PatchOutcome {
    Committed,
    Rejected { diagnostics: String },
    Skipped { reason: String },
}

impl PatchOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, PatchOutcome::Committed)
    }
}

/// One row of the fix matrix artifact
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixMatrixRow {
    package: PackageName,
    current: PackageVersion,
    dependency_type: DependencyType,
    #[serde(skip_serializing_if = "Option::is_none")]
    chosen: Option<PackageVersion>,
    rationale: String,
    #[serde(flatten)]
    outcome: PatchOutcome,
}

impl FixMatrixRow {
    pub fn new(
        package: PackageName,
        current: PackageVersion,
        dependency_type: DependencyType,
        chosen: Option<PackageVersion>,
        rationale: String,
        outcome: PatchOutcome,
    ) -> Self {
        Self {
            package,
            current,
            dependency_type,
            chosen,
            rationale,
            outcome,
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

    pub fn chosen(&self) -> Option<&PackageVersion> {
        self.chosen.as_ref()
    }

    pub fn rationale(&self) -> &str {
        &self.rationale
    }

    pub fn outcome(&self) -> &PatchOutcome {
        &self.outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fix_matrix_row_serializes_outcome() {
        let row = FixMatrixRow::new(
            PackageName::new("jinja2").unwrap(),
            PackageVersion::parse("2.10").unwrap(),
            DependencyType::Direct,
            Some(PackageVersion::parse("2.10.1").unwrap()),
            "Closest safe version to current (2.10).".to_string(),
            PatchOutcome::Rejected {
                diagnostics: "ImportError".to_string(),
            },
        );
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["outcome"], "rejected");
        assert_eq!(json["diagnostics"], "ImportError");
        assert_eq!(json["chosen"], "2.10.1");
    }

    #[test]
    fn test_patch_outcome_is_committed() {
        assert!(PatchOutcome::Committed.is_committed());
        assert!(!PatchOutcome::Skipped {
            reason: "no verify command".to_string()
        }
        .is_committed());
    }
}
