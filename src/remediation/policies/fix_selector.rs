use crate::remediation::domain::{CandidateRow, FixDecision, PackageName, PackageVersion};
use crate::shared::Result;
use async_trait::async_trait;

/// Everything a strategy may look at when choosing a fix
#[derive(Debug, Clone, PartialEq)]
pub struct FixRequest {
    pub package: PackageName,
    pub current: PackageVersion,
    /// Ascending upgrade candidates
    pub candidates: Vec<PackageVersion>,
    pub max_severity: Option<f32>,
    /// Advisory ids behind the candidates
    pub advisories: Vec<String>,
}

impl FixRequest {
    pub fn from_row(row: &CandidateRow, advisories: Vec<String>) -> Self {
        Self {
            package: row.package().clone(),
            current: row.current().clone(),
            candidates: row.candidates().to_vec(),
            max_severity: row.max_severity(),
            advisories,
        }
    }

    /// Candidates strictly above the current version
    pub fn eligible(&self) -> Vec<&PackageVersion> {
        self.candidates
            .iter()
            .filter(|c| *c > &self.current)
            .collect()
    }

    pub fn no_fix(&self) -> FixDecision {
        FixDecision::NoAcceptableFix {
            reason: format!(
                "no candidate is newer than the current version {}",
                self.current
            ),
        }
    }
}

/// FixSelector policy: picks one target version per vulnerable package.
///
/// Implementations are interchangeable; callers never branch on which
/// strategy is active.
#[async_trait]
pub trait FixSelector: Send + Sync {
    /// Short strategy name for logs and reports
    fn name(&self) -> &'static str;

    /// Returns a selection above the current version, or
    /// `NoAcceptableFix` when none exists.
    ///
    /// # Errors
    /// Only for failures of an external collaborator the strategy depends
    /// on; callers record these per package.
    async fn select(&self, request: &FixRequest) -> Result<FixDecision>;
}
