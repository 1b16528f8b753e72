use crate::remediation::domain::{
    CandidateRow, FixMatrixRow, Issue, RequirementRecord, RunMetadata, VulnerabilityReport,
};
use crate::remediation::services::SkippedLine;
use crate::shared::error::ExitCode;
use std::collections::HashSet;
use std::path::PathBuf;

/// RemediationReport - Internal response DTO from the remediation use case
///
/// Carries every stage's output so the console summary and the artifact
/// writer can work from one value. Per-node and per-package failures are
/// in `issues`; nothing that was skipped is dropped.
#[derive(Debug, Clone)]
pub struct RemediationReport {
    pub metadata: RunMetadata,
    /// Direct requirements, in manifest order
    pub requirements: Vec<RequirementRecord>,
    /// Manifest lines that were not turned into requirements
    pub skipped_lines: Vec<SkippedLine>,
    pub vulnerability_report: VulnerabilityReport,
    /// Advisory ids removed by the ignore list
    pub ignored_advisories: Vec<String>,
    pub candidates: Vec<CandidateRow>,
    /// Empty when the run stopped after scanning
    pub fix_matrix: Vec<FixMatrixRow>,
    pub issues: Vec<Issue>,
    /// Final baseline content; None for scan-only runs
    pub recommended_manifest: Option<String>,
    /// Files written to the output directory
    pub artifacts: Vec<PathBuf>,
    pub scan_only: bool,
}

impl RemediationReport {
    /// Vulnerable packages whose fix was not committed
    pub fn unremediated(&self) -> Vec<String> {
        let committed: HashSet<(&str, &str)> = self
            .fix_matrix
            .iter()
            .filter(|row| row.outcome().is_committed())
            .map(|row| (row.package().as_str(), row.current().as_str()))
            .collect();

        self.vulnerability_report
            .vulnerable()
            .filter(|f| !committed.contains(&(f.package().as_str(), f.current().as_str())))
            .map(|f| format!("{}=={}", f.package(), f.current()))
            .collect()
    }

    /// 0 when nothing vulnerable remains and every package was scanned,
    /// 1 otherwise. Scan-only runs never count as remediated.
    pub fn exit_code(&self) -> ExitCode {
        let failed_scans = self.vulnerability_report.failed().next().is_some();
        if failed_scans || !self.unremediated().is_empty() {
            ExitCode::VulnerabilitiesRemain
        } else {
            ExitCode::Success
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remediation::domain::{
        AffectedRange, DependencyGraph, DependencyType, Finding, PackageId, PackageName,
        PackageVersion, PatchOutcome, RangeKind, VulnerabilityRecord,
    };

    fn id(name: &str, version: &str) -> PackageId {
        PackageId::new(
            PackageName::new(name).unwrap(),
            PackageVersion::parse(version).unwrap(),
        )
    }

    fn advisory() -> VulnerabilityRecord {
        VulnerabilityRecord::new(
            "GHSA-test".to_string(),
            "test".to_string(),
            "https://osv.dev/vulnerability/GHSA-test".to_string(),
            None,
            vec![AffectedRange::new(
                None,
                Some("2.0".to_string()),
                RangeKind::Ecosystem,
            )],
            vec![],
        )
    }

    fn report(findings: Vec<Finding>, fix_matrix: Vec<FixMatrixRow>) -> RemediationReport {
        RemediationReport {
            metadata: RunMetadata::generate(),
            requirements: vec![],
            skipped_lines: vec![],
            vulnerability_report: VulnerabilityReport::new(findings, DependencyGraph::new()),
            ignored_advisories: vec![],
            candidates: vec![],
            fix_matrix,
            issues: vec![],
            recommended_manifest: None,
            artifacts: vec![],
            scan_only: false,
        }
    }

    fn row(name: &str, current: &str, outcome: PatchOutcome) -> FixMatrixRow {
        FixMatrixRow::new(
            PackageName::new(name).unwrap(),
            PackageVersion::parse(current).unwrap(),
            DependencyType::Direct,
            Some(PackageVersion::parse("2.0").unwrap()),
            "nearest".to_string(),
            outcome,
        )
    }

    #[test]
    fn test_clean_run_succeeds() {
        let report = report(vec![Finding::scanned(&id("six", "1.16.0"), true, vec![])], vec![]);
        assert_eq!(report.exit_code(), ExitCode::Success);
    }

    #[test]
    fn test_committed_fix_clears_vulnerability() {
        let report = report(
            vec![Finding::scanned(&id("a", "1.0"), true, vec![advisory()])],
            vec![row("a", "1.0", PatchOutcome::Committed)],
        );
        assert!(report.unremediated().is_empty());
        assert_eq!(report.exit_code(), ExitCode::Success);
    }

    #[test]
    fn test_rejected_fix_leaves_vulnerability() {
        let report = report(
            vec![Finding::scanned(&id("a", "1.0"), true, vec![advisory()])],
            vec![row(
                "a",
                "1.0",
                PatchOutcome::Rejected {
                    diagnostics: "tests failed".to_string(),
                },
            )],
        );
        assert_eq!(report.unremediated(), vec!["a==1.0".to_string()]);
        assert_eq!(report.exit_code(), ExitCode::VulnerabilitiesRemain);
    }

    #[test]
    fn test_failed_scan_is_not_success() {
        let report = report(
            vec![Finding::failed(&id("a", "1.0"), true, "timeout".to_string())],
            vec![],
        );
        assert_eq!(report.exit_code(), ExitCode::VulnerabilitiesRemain);
    }
}
