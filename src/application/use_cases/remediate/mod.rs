use super::build_graph::BuildDependencyGraphUseCase;
use super::parse_manifest::{LoadedManifest, ParseManifestUseCase};
use super::patch_validator::PatchValidator;
use super::scan_vulnerabilities::{ScanSettings, ScanVulnerabilitiesUseCase};
use crate::application::dto::{RemediationReport, RemediationRequest};
use crate::ports::inbound::RemediationPort;
use crate::ports::outbound::{
    Artifact, ArtifactWriter, DependencyMetadataSource, ManifestReader, ProgressReporter,
    ReleaseRegistry, VerificationProcedure, VulnerabilitySource,
};
use crate::remediation::domain::{
    CandidateRow, DependencyGraph, FixDecision, FixMatrixRow, FixSelection, Issue, PackageName,
    PackageVersion, PatchOutcome, RunMetadata, ScanStatus, Stage, VulnerabilityReport,
};
use crate::remediation::policies::{FixRequest, FixSelector, NearestVersionSelector};
use crate::remediation::services::{CandidateMatrixBuilder, MarkerEnvironment, VersionResolver};
use crate::shared::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::warn;


const NO_VERIFIER_REASON: &str = "no verification command configured";

/// Per-package decision before patching
enum Decision {
    Selected(FixSelection),
    NotSelected(String),
}

#[derive(Serialize)]
struct ReportArtifact<'r> {
    metadata: &'r RunMetadata,
    #[serde(flatten)]
    report: &'r VulnerabilityReport,
    ignored_advisories: &'r [String],
    issues: &'r [Issue],
}

#[derive(Serialize)]
struct RowsArtifact<'r, T: Serialize> {
    metadata: &'r RunMetadata,
    rows: &'r [T],
}

/// RemediateUseCase - Core use case for a remediation run
///
/// Drives the stages strictly left to right: manifest, graph, scan,
/// candidates, selection, patch validation. Each stage's output is kept
/// in the returned report and written as an artifact.
///
/// # Type Parameters
/// * `M` - ManifestReader implementation
/// * `R` - ReleaseRegistry behind the version resolver
/// * `S` - DependencyMetadataSource implementation
/// * `V` - VulnerabilitySource implementation
/// * `VP` - VerificationProcedure implementation (optional)
/// * `W` - ArtifactWriter implementation
/// * `PR` - ProgressReporter implementation
pub struct RemediateUseCase<M, R, S, V, VP, W, PR>
where
    R: ReleaseRegistry,
{
    manifest_reader: M,
    resolver: VersionResolver<R>,
    metadata_source: S,
    vulnerability_source: V,
    verifier: Option<VP>,
    artifact_writer: W,
    progress_reporter: PR,
    fix_selector: Box<dyn FixSelector>,
    environment: MarkerEnvironment,
    scan_settings: ScanSettings,
}

impl<M, R, S, V, VP, W, PR> RemediateUseCase<M, R, S, V, VP, W, PR>
where
    M: ManifestReader,
    R: ReleaseRegistry,
    S: DependencyMetadataSource,
    V: VulnerabilitySource,
    VP: VerificationProcedure,
    W: ArtifactWriter,
    PR: ProgressReporter,
{
    /// Creates a new RemediateUseCase with injected dependencies.
    ///
    /// Defaults: nearest-version selection, the running interpreter's
    /// marker environment, default scan pacing.
    pub fn new(
        manifest_reader: M,
        resolver: VersionResolver<R>,
        metadata_source: S,
        vulnerability_source: V,
        verifier: Option<VP>,
        artifact_writer: W,
        progress_reporter: PR,
    ) -> Self {
        Self {
            manifest_reader,
            resolver,
            metadata_source,
            vulnerability_source,
            verifier,
            artifact_writer,
            progress_reporter,
            fix_selector: Box::new(NearestVersionSelector::new()),
            environment: MarkerEnvironment::current(),
            scan_settings: ScanSettings::default(),
        }
    }

    pub fn with_fix_selector(mut self, fix_selector: Box<dyn FixSelector>) -> Self {
        self.fix_selector = fix_selector;
        self
    }

    pub fn with_environment(mut self, environment: MarkerEnvironment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_scan_settings(mut self, scan_settings: ScanSettings) -> Self {
        self.scan_settings = scan_settings;
        self
    }

    /// Executes the remediation use case
    ///
    /// # Arguments
    /// * `request` - Manifest path and run options
    ///
    /// # Returns
    /// RemediationReport with every stage's output and all isolated issues
    ///
    /// # Errors
    /// Parse failures, an invalid baseline and artifact write failures
    /// abort the run. Everything scoped to one node or package is recorded
    /// as an issue instead.
    pub async fn execute(&self, request: RemediationRequest) -> Result<RemediationReport> {
        let metadata = RunMetadata::generate();
        let mut issues = Vec::new();
        let mut artifacts = Vec::new();

        // Step 1: Read and parse the manifest
        let manifest = self.load_manifest(&request).await?;

        // Step 2: Expand to the transitive graph
        let graph = {
            self.progress_reporter
                .report("🔗 Resolving transitive dependencies...");
            let build = BuildDependencyGraphUseCase::new(
                &self.metadata_source,
                &self.resolver,
                &self.progress_reporter,
            )
            .execute(&manifest.requirements)
            .await;
            self.progress_reporter.report_completion(&format!(
                "✅ Resolved {} package(s) ({} direct, {} transitive)",
                build.graph.total_package_count(),
                build.graph.direct_dependency_count(),
                build.graph.transitive_dependency_count()
            ));
            issues.extend(build.issues);
            build.graph
        };

        // Step 3: Scan every node
        let report = self.scan(graph).await;
        issues.extend(report.failed().filter_map(|finding| match finding.status() {
            ScanStatus::Failed { error } => Some(Issue::new(
                Stage::Scan,
                format!("{}=={}", finding.package(), finding.current()),
                error.clone(),
            )),
            ScanStatus::Scanned => None,
        }));

        // Step 4: Drop ignored advisories
        let (report, ignored_advisories) = report.without_advisories(&request.ignore_vulns);
        if !ignored_advisories.is_empty() {
            self.progress_reporter.report(&format!(
                "🚫 Ignored {} advisory id(s): {}",
                ignored_advisories.len(),
                ignored_advisories.join(", ")
            ));
        }

        // Step 5: Upgrade candidates
        let candidates = CandidateMatrixBuilder::build(&report);

        artifacts.push(self.write_json(
            Artifact::VulnerabilityReport,
            &ReportArtifact {
                metadata: &metadata,
                report: &report,
                ignored_advisories: &ignored_advisories,
                issues: &issues,
            },
        )?);
        artifacts.push(self.write_json(
            Artifact::CandidateMatrix,
            &RowsArtifact {
                metadata: &metadata,
                rows: &candidates,
            },
        )?);

        if request.scan_only {
            return Ok(RemediationReport {
                metadata,
                requirements: manifest.requirements,
                skipped_lines: manifest.skipped,
                vulnerability_report: report,
                ignored_advisories,
                candidates,
                fix_matrix: Vec::new(),
                issues,
                recommended_manifest: None,
                artifacts,
                scan_only: true,
            });
        }

        // Step 6: Choose one target per vulnerable package
        let decisions = self.select_fixes(&report, &candidates, &mut issues).await;

        // Step 7: Trial each selection against the baseline
        let (outcomes, recommended) = self
            .validate_patches(&request, &manifest, &decisions)
            .await?;

        // Step 8: Assemble the fix matrix
        let fix_matrix: Vec<FixMatrixRow> = candidates
            .iter()
            .zip(decisions)
            .zip(outcomes)
            .map(|((row, decision), outcome)| {
                if let PatchOutcome::Rejected { diagnostics } = &outcome {
                    issues.push(Issue::new(
                        Stage::Patch,
                        format!("{}=={}", row.package(), row.current()),
                        diagnostics.clone(),
                    ));
                }
                let (chosen, rationale) = match decision {
                    Decision::Selected(selection) => (
                        Some(selection.chosen().clone()),
                        selection.rationale().to_string(),
                    ),
                    Decision::NotSelected(reason) => (None, reason),
                };
                FixMatrixRow::new(
                    row.package().clone(),
                    row.current().clone(),
                    row.dependency_type(),
                    chosen,
                    rationale,
                    outcome,
                )
            })
            .collect();

        // Step 9: Persist the remaining artifacts
        artifacts.push(self.write_json(
            Artifact::FixMatrix,
            &RowsArtifact {
                metadata: &metadata,
                rows: &fix_matrix,
            },
        )?);
        artifacts.push(
            self.artifact_writer
                .write_artifact(Artifact::RecommendedManifest, &recommended)?,
        );

        Ok(RemediationReport {
            metadata,
            requirements: manifest.requirements,
            skipped_lines: manifest.skipped,
            vulnerability_report: report,
            ignored_advisories,
            candidates,
            fix_matrix,
            issues,
            recommended_manifest: Some(recommended),
            artifacts,
            scan_only: false,
        })
    }

    /// Reads and parses the manifest, reporting progress
    async fn load_manifest(&self, request: &RemediationRequest) -> Result<LoadedManifest> {
        self.progress_reporter.report(&format!(
            "📖 Loading manifest from: {}",
            request.manifest_path.display()
        ));

        let manifest =
            ParseManifestUseCase::new(&self.manifest_reader, &self.resolver, &self.environment)
                .execute(&request.manifest_path)
                .await?;

        self.progress_reporter.report(&format!(
            "✅ Detected {} requirement(s)",
            manifest.requirements.len()
        ));
        for skipped in &manifest.skipped {
            self.progress_reporter.report(&format!(
                "   ⏭️  line {}: {} ({})",
                skipped.line_number, skipped.text, skipped.reason
            ));
        }
        Ok(manifest)
    }

    async fn scan(&self, graph: DependencyGraph) -> VulnerabilityReport {
        self.progress_reporter.report(&format!(
            "🔍 Checking {} package(s) for known vulnerabilities...",
            graph.total_package_count()
        ));
        let report = ScanVulnerabilitiesUseCase::new(
            &self.vulnerability_source,
            &self.progress_reporter,
            self.scan_settings,
        )
        .execute(graph)
        .await;

        let (advisories, packages) = report.summarize();
        self.progress_reporter.report_completion(&format!(
            "✅ Found {} advisory match(es) across {} package(s)",
            advisories, packages
        ));
        let failed = report.failed().count();
        if failed > 0 {
            self.progress_reporter.report_error(&format!(
                "⚠️  Warning: {} package(s) could not be scanned",
                failed
            ));
        }
        report
    }

    /// One decision per candidate row, in row order
    async fn select_fixes(
        &self,
        report: &VulnerabilityReport,
        candidates: &[CandidateRow],
        issues: &mut Vec<Issue>,
    ) -> Vec<Decision> {
        if candidates.is_empty() {
            return Vec::new();
        }
        self.progress_reporter.report(&format!(
            "🎯 Selecting fixes with the '{}' strategy...",
            self.fix_selector.name()
        ));

        let advisories: HashMap<(&PackageName, &PackageVersion), Vec<String>> = report
            .vulnerable()
            .map(|f| {
                (
                    (f.package(), f.current()),
                    f.vulns().iter().map(|v| v.id().to_string()).collect(),
                )
            })
            .collect();

        let mut decisions = Vec::with_capacity(candidates.len());
        for (index, row) in candidates.iter().enumerate() {
            self.progress_reporter.report_progress(
                index,
                candidates.len(),
                Some(row.package().as_str()),
            );
            let ids = advisories
                .get(&(row.package(), row.current()))
                .cloned()
                .unwrap_or_default();
            let request = FixRequest::from_row(row, ids);

            let decision = match self.fix_selector.select(&request).await {
                Ok(FixDecision::Selected(selection)) => Decision::Selected(selection),
                Ok(FixDecision::NoAcceptableFix { reason }) => Decision::NotSelected(reason),
                Err(e) => {
                    let error = format!("{:#}", e);
                    warn!(package = %row.package(), error = %error, "Fix selection failed");
                    issues.push(Issue::new(
                        Stage::Selection,
                        format!("{}=={}", row.package(), row.current()),
                        error.clone(),
                    ));
                    Decision::NotSelected(format!("selection failed: {}", error))
                }
            };
            decisions.push(decision);
        }

        let selected = decisions
            .iter()
            .filter(|d| matches!(d, Decision::Selected(_)))
            .count();
        self.progress_reporter.report_completion(&format!(
            "✅ Selected a fix for {} of {} vulnerable package(s)",
            selected,
            decisions.len()
        ));
        decisions
    }

    /// Returns one outcome per decision plus the recommended manifest
    async fn validate_patches(
        &self,
        request: &RemediationRequest,
        manifest: &LoadedManifest,
        decisions: &[Decision],
    ) -> Result<(Vec<PatchOutcome>, String)> {
        let selections: Vec<FixSelection> = decisions
            .iter()
            .filter_map(|d| match d {
                Decision::Selected(selection) => Some(selection.clone()),
                Decision::NotSelected(_) => None,
            })
            .collect();

        let (trial_outcomes, recommended) = match (&self.verifier, selections.is_empty()) {
            (_, true) => (Vec::new(), manifest.content.clone()),
            (None, false) => {
                self.progress_reporter.report_error(&format!(
                    "⚠️  Warning: {} fix(es) selected but not applied: {}",
                    selections.len(),
                    NO_VERIFIER_REASON
                ));
                (Vec::new(), manifest.content.clone())
            }
            (Some(verifier), false) => {
                let run = PatchValidator::new(verifier, &self.progress_reporter)
                    .run(&request.manifest_path, &manifest.content, &selections)
                    .await?;
                (run.outcomes, run.baseline)
            }
        };

        let mut trial_outcomes = trial_outcomes.into_iter();
        let outcomes = decisions
            .iter()
            .map(|decision| match decision {
                Decision::NotSelected(reason) => PatchOutcome::Skipped {
                    reason: reason.clone(),
                },
                Decision::Selected(_) => trial_outcomes.next().unwrap_or(PatchOutcome::Skipped {
                    reason: NO_VERIFIER_REASON.to_string(),
                }),
            })
            .collect();
        Ok((outcomes, recommended))
    }

    fn write_json<T: Serialize>(&self, artifact: Artifact, value: &T) -> Result<PathBuf> {
        let json = serde_json::to_string_pretty(value)?;
        self.artifact_writer.write_artifact(artifact, &json)
    }
}

#[async_trait]
impl<M, R, S, V, VP, W, PR> RemediationPort for RemediateUseCase<M, R, S, V, VP, W, PR>
where
    M: ManifestReader + Sync,
    R: ReleaseRegistry,
    S: DependencyMetadataSource,
    V: VulnerabilitySource,
    VP: VerificationProcedure,
    W: ArtifactWriter + Sync,
    PR: ProgressReporter,
{
    async fn remediate(&self, request: RemediationRequest) -> Result<RemediationReport> {
        self.execute(request).await
    }
}
