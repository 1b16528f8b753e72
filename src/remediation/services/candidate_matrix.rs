use crate::remediation::domain::{
    CandidateRow, DependencyType, Finding, PackageVersion, VulnerabilityReport,
};
use std::collections::BTreeSet;
use tracing::debug;

/// Derives upgrade candidates from scan findings.
pub struct CandidateMatrixBuilder;

impl CandidateMatrixBuilder {
    /// One row per vulnerable finding, in report order
    pub fn build(report: &VulnerabilityReport) -> Vec<CandidateRow> {
        report
            .vulnerable()
            .map(|finding| {
                CandidateRow::new(
                    finding.package().clone(),
                    finding.current().clone(),
                    DependencyType::from_is_direct(finding.is_direct()),
                    Self::candidates_for(finding),
                    finding.max_severity(),
                )
            })
            .collect()
    }

    /// Collects fixed versions and reopening introduced versions, keeping
    /// only valid versions strictly above the current pin.
    ///
    /// The result is strictly ascending with no duplicates.
    pub fn candidates_for(finding: &Finding) -> Vec<PackageVersion> {
        let current = finding.current();
        let mut candidates = BTreeSet::new();

        for range in finding
            .vulns()
            .iter()
            .flat_map(|v| v.ranges())
            .filter(|r| r.kind.is_version_based())
        {
            let collected = range.fixed.iter().chain(range.introduced.iter());
            for raw in collected {
                match PackageVersion::try_parse(raw) {
                    Some(version) if &version > current => {
                        candidates.insert(version);
                    }
                    Some(_) => {}
                    None => {
                        debug!(package = %finding.package(), value = %raw, "Discarding malformed candidate")
                    }
                }
            }
        }

        candidates.into_iter().collect()
    }
}
