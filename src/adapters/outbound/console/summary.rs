use crate::application::dto::RemediationReport;
use crate::remediation::domain::{FixMatrixRow, PatchOutcome};
use owo_colors::OwoColorize;

/// Diagnostics longer than this are cut in the summary; the fix matrix
/// artifact keeps the full text.
const MAX_DIAGNOSTIC_CHARS: usize = 200;

/// SummaryFormatter renders the end-of-run terminal summary
///
/// Every skipped or failed item is listed with its package identity and
/// error text.
pub struct SummaryFormatter {
    color: bool,
}

impl SummaryFormatter {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    pub fn render(&self, report: &RemediationReport) -> String {
        let mut output = String::new();
        self.render_counts(&mut output, report);
        if report.scan_only {
            self.render_candidates(&mut output, report);
        } else {
            self.render_fixes(&mut output, &report.fix_matrix);
        }
        self.render_issues(&mut output, report);
        self.render_artifacts(&mut output, report);
        output
    }

    fn green(&self, text: &str) -> String {
        if self.color {
            text.green().to_string()
        } else {
            text.to_string()
        }
    }

    fn red(&self, text: &str) -> String {
        if self.color {
            text.red().to_string()
        } else {
            text.to_string()
        }
    }

    fn yellow(&self, text: &str) -> String {
        if self.color {
            text.yellow().to_string()
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        if self.color {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }
}

/// Helper methods for rendering sections
impl SummaryFormatter {
    fn render_counts(&self, output: &mut String, report: &RemediationReport) {
        let graph = report.vulnerability_report.graph();
        let (advisories, vulnerable) = report.vulnerability_report.summarize();
        let failed = report.vulnerability_report.failed().count();

        output.push_str(&self.bold("📊 Remediation summary\n"));
        output.push_str(&format!(
            "   Packages scanned: {} ({} direct, {} transitive)\n",
            graph.total_package_count(),
            graph.direct_dependency_count(),
            graph.transitive_dependency_count()
        ));

        let vulnerable_line = format!(
            "   Vulnerable packages: {} ({} advisory match(es))",
            vulnerable, advisories
        );
        if vulnerable == 0 {
            output.push_str(&self.green(&vulnerable_line));
        } else {
            output.push_str(&self.red(&vulnerable_line));
        }
        output.push('\n');

        if failed > 0 {
            output.push_str(&self.yellow(&format!("   Scan failures: {}", failed)));
            output.push('\n');
        }
        if !report.ignored_advisories.is_empty() {
            output.push_str(&format!(
                "   Ignored advisories: {}\n",
                report.ignored_advisories.join(", ")
            ));
        }
        if !report.skipped_lines.is_empty() {
            output.push_str(&format!(
                "   Manifest lines skipped: {}\n",
                report.skipped_lines.len()
            ));
        }
        output.push('\n');
    }

    fn render_candidates(&self, output: &mut String, report: &RemediationReport) {
        if report.candidates.is_empty() {
            return;
        }
        output.push_str(&self.bold("Upgrade candidates:\n"));
        for row in &report.candidates {
            let candidates = if row.candidates().is_empty() {
                "none".to_string()
            } else {
                row.candidates()
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            output.push_str(&format!(
                "   {} {} ({}): {}\n",
                row.package(),
                row.current(),
                row.dependency_type(),
                candidates
            ));
        }
        output.push('\n');
    }

    fn render_fixes(&self, output: &mut String, rows: &[FixMatrixRow]) {
        if rows.is_empty() {
            return;
        }
        output.push_str(&self.bold("Fixes:\n"));
        for row in rows {
            let target = match row.chosen() {
                Some(chosen) => format!("{} {} -> {}", row.package(), row.current(), chosen),
                None => format!("{} {}", row.package(), row.current()),
            };
            let line = match row.outcome() {
                PatchOutcome::Committed => {
                    self.green(&format!("   ✅ {} ({}) committed", target, row.dependency_type()))
                }
                PatchOutcome::Rejected { diagnostics } => self.red(&format!(
                    "   ❌ {} ({}) rejected: {}",
                    target,
                    row.dependency_type(),
                    truncate(diagnostics)
                )),
                PatchOutcome::Skipped { reason } => {
                    let reason = if row.chosen().is_none() {
                        row.rationale()
                    } else {
                        reason.as_str()
                    };
                    self.yellow(&format!(
                        "   ⏭️  {} ({}) skipped: {}",
                        target,
                        row.dependency_type(),
                        reason
                    ))
                }
            };
            output.push_str(&line);
            output.push('\n');
        }
        output.push('\n');
    }

    fn render_issues(&self, output: &mut String, report: &RemediationReport) {
        if report.issues.is_empty() {
            return;
        }
        output.push_str(&self.bold(&format!("Issues ({}):\n", report.issues.len())));
        for issue in &report.issues {
            output.push_str(&self.yellow(&format!(
                "   ⚠️  [{}] {}: {}",
                issue.stage,
                issue.subject,
                truncate(&issue.error)
            )));
            output.push('\n');
        }
        output.push('\n');
    }

    fn render_artifacts(&self, output: &mut String, report: &RemediationReport) {
        if report.artifacts.is_empty() {
            return;
        }
        output.push_str(&self.bold("Artifacts:\n"));
        for path in &report.artifacts {
            output.push_str(&format!("   📄 {}\n", path.display()));
        }
    }
}

/// First line only, capped in length
fn truncate(text: &str) -> String {
    let first_line = text.lines().next().unwrap_or("").trim();
    if first_line.chars().count() > MAX_DIAGNOSTIC_CHARS {
        let cut: String = first_line.chars().take(MAX_DIAGNOSTIC_CHARS).collect();
        format!("{}…", cut)
    } else if text.lines().nth(1).is_some() {
        format!("{} (see fix_matrix.json)", first_line)
    } else {
        first_line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remediation::domain::{
        DependencyGraph, DependencyType, Finding, Issue, PackageId, PackageName, PackageVersion,
        RunMetadata, Stage, VulnerabilityReport,
    };
    use std::path::PathBuf;

    fn version(v: &str) -> PackageVersion {
        PackageVersion::parse(v).unwrap()
    }

    fn report(fix_matrix: Vec<FixMatrixRow>, issues: Vec<Issue>) -> RemediationReport {
        let mut graph = DependencyGraph::new();
        let id = PackageId::new(PackageName::new("six").unwrap(), version("1.16.0"));
        graph.add_node(id.clone(), true, 1);
        RemediationReport {
            metadata: RunMetadata::generate(),
            requirements: vec![],
            skipped_lines: vec![],
            vulnerability_report: VulnerabilityReport::new(
                vec![Finding::scanned(&id, true, vec![])],
                graph,
            ),
            ignored_advisories: vec!["GHSA-x".to_string()],
            candidates: vec![],
            fix_matrix,
            issues,
            recommended_manifest: None,
            artifacts: vec![PathBuf::from("out/fix_matrix.json")],
            scan_only: false,
        }
    }

    fn row(name: &str, chosen: Option<&str>, outcome: PatchOutcome) -> FixMatrixRow {
        FixMatrixRow::new(
            PackageName::new(name).unwrap(),
            version("1.0"),
            DependencyType::Direct,
            chosen.map(version),
            "no candidate is newer than the current version 1.0".to_string(),
            outcome,
        )
    }

    #[test]
    fn test_render_plain_summary() {
        let output = SummaryFormatter::new(false).render(&report(
            vec![
                row("alpha", Some("1.1"), PatchOutcome::Committed),
                row(
                    "beta",
                    Some("2.0"),
                    PatchOutcome::Rejected {
                        diagnostics: "ImportError: cannot import name\nTraceback...".to_string(),
                    },
                ),
                row(
                    "gamma",
                    None,
                    PatchOutcome::Skipped {
                        reason: "no acceptable fix".to_string(),
                    },
                ),
            ],
            vec![Issue::new(Stage::Graph, "flask==2.0.0", "status code 500")],
        ));

        assert!(output.contains("Packages scanned: 1 (1 direct, 0 transitive)"));
        assert!(output.contains("Vulnerable packages: 0"));
        assert!(output.contains("Ignored advisories: GHSA-x"));
        assert!(output.contains("✅ alpha 1.0 -> 1.1 (DIRECT) committed"));
        assert!(output.contains(
            "❌ beta 1.0 -> 2.0 (DIRECT) rejected: ImportError: cannot import name (see fix_matrix.json)"
        ));
        assert!(output.contains("gamma 1.0 (DIRECT) skipped: no candidate is newer"));
        assert!(output.contains("[graph] flask==2.0.0: status code 500"));
        assert!(output.contains("📄 out/fix_matrix.json"));
        assert!(!output.contains('\u{1b}'));
    }

    #[test]
    fn test_render_colored_summary_has_escapes() {
        let output = SummaryFormatter::new(true).render(&report(vec![], vec![]));
        assert!(output.contains('\u{1b}'));
    }

    #[test]
    fn test_truncate_long_diagnostics() {
        let long = "x".repeat(MAX_DIAGNOSTIC_CHARS + 10);
        let cut = truncate(&long);
        assert_eq!(cut.chars().count(), MAX_DIAGNOSTIC_CHARS + 1);
        assert_eq!(truncate("single line"), "single line");
    }
}
