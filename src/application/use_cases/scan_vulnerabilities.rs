use crate::ports::outbound::{ProgressReporter, VulnerabilitySource};
use crate::remediation::domain::{DependencyGraph, Finding, PackageId, VulnerabilityReport};
use crate::shared::RetryPolicy;
use std::time::Duration;
use tracing::{info, warn};

/// Rate limiting: delay between batch requests (milliseconds)
pub const DEFAULT_SCAN_THROTTLE_MS: u64 = 50;

/// Pacing and batching for the scan stage
#[derive(Debug, Clone, Copy)]
pub struct ScanSettings {
    /// Upper bound on queries per call; also capped by the source
    pub batch_size: usize,
    /// Fixed delay between consecutive batches
    pub throttle: Duration,
    pub retry: RetryPolicy,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            throttle: Duration::from_millis(DEFAULT_SCAN_THROTTLE_MS),
            retry: RetryPolicy::default(),
        }
    }
}

/// ScanVulnerabilitiesUseCase - queries the vulnerability source for every
/// graph node and assembles one Finding per node.
///
/// A batch that still fails after retries, or whose response does not line
/// up with its queries, marks its members as failed. A package whose own
/// entry is an error is failed alone. Other packages are unaffected.
pub struct ScanVulnerabilitiesUseCase<'a, V: VulnerabilitySource, PR: ProgressReporter> {
    source: &'a V,
    progress_reporter: &'a PR,
    settings: ScanSettings,
}

impl<'a, V: VulnerabilitySource, PR: ProgressReporter> ScanVulnerabilitiesUseCase<'a, V, PR> {
    pub fn new(source: &'a V, progress_reporter: &'a PR, settings: ScanSettings) -> Self {
        Self {
            source,
            progress_reporter,
            settings,
        }
    }

    fn chunk_size(&self) -> usize {
        self.settings
            .batch_size
            .clamp(1, self.source.max_batch_size().max(1))
    }

    /// Scans every node of `graph`; findings follow graph node order.
    pub async fn execute(&self, graph: DependencyGraph) -> VulnerabilityReport {
        let nodes: Vec<(PackageId, bool)> = graph
            .nodes()
            .iter()
            .map(|node| (node.id().clone(), node.is_direct()))
            .collect();
        let total = nodes.len();
        let mut findings = Vec::with_capacity(total);

        for (index, chunk) in nodes.chunks(self.chunk_size()).enumerate() {
            if index > 0 && !self.settings.throttle.is_zero() {
                tokio::time::sleep(self.settings.throttle).await;
            }

            let ids: Vec<PackageId> = chunk.iter().map(|(id, _)| id.clone()).collect();
            let result = self
                .settings
                .retry
                .run("vulnerability batch query", || self.source.query_batch(&ids))
                .await;

            match result {
                Ok(matches) if matches.len() == chunk.len() => {
                    findings.extend(chunk.iter().zip(matches).map(|((id, is_direct), entry)| {
                        match entry {
                            Ok(vulns) => Finding::scanned(id, *is_direct, vulns),
                            Err(error) => {
                                warn!(package = %id, error = %error, "Vulnerability lookup incomplete");
                                Finding::failed(id, *is_direct, error)
                            }
                        }
                    }));
                }
                Ok(matches) => {
                    let error = format!(
                        "vulnerability source returned {} results for {} queries",
                        matches.len(),
                        chunk.len()
                    );
                    warn!(batch = index, "{}", error);
                    findings.extend(failed_findings(chunk, &error));
                }
                Err(e) => {
                    let error = format!("{:#}", e);
                    warn!(batch = index, size = chunk.len(), error = %error, "Vulnerability batch failed");
                    findings.extend(failed_findings(chunk, &error));
                }
            }

            self.progress_reporter.report_progress(
                findings.len(),
                total,
                Some("Checking advisories..."),
            );
        }

        let report = VulnerabilityReport::new(findings, graph);
        let (advisories, packages) = report.summarize();
        info!(advisories, packages, failed = report.failed().count(), "Scan complete");
        report
    }
}

fn failed_findings(chunk: &[(PackageId, bool)], error: &str) -> Vec<Finding> {
    chunk
        .iter()
        .map(|(id, is_direct)| Finding::failed(id, *is_direct, error.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remediation::domain::{
        AffectedRange, PackageName, PackageVersion, RangeKind, VulnerabilityRecord,
    };
    use crate::ports::outbound::PackageAdvisories;
    use crate::shared::error::RemediationError;
    use crate::shared::Result;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct SilentReporter;

    impl ProgressReporter for SilentReporter {
        fn report(&self, _message: &str) {}
        fn report_progress(&self, _current: usize, _total: usize, _message: Option<&str>) {}
        fn report_error(&self, _message: &str) {}
        fn report_completion(&self, _message: &str) {}
    }

    /// Flags every package named "bad"; batches containing "down" fail;
    /// packages named "partial" get an error entry.
    struct ScriptedSource {
        max_batch: usize,
        batch_sizes: Mutex<Vec<usize>>,
        attempts: Mutex<usize>,
        short_response: bool,
    }

    impl ScriptedSource {
        fn new(max_batch: usize) -> Self {
            Self {
                max_batch,
                batch_sizes: Mutex::new(Vec::new()),
                attempts: Mutex::new(0),
                short_response: false,
            }
        }
    }

    #[async_trait]
    impl VulnerabilitySource for ScriptedSource {
        fn max_batch_size(&self) -> usize {
            self.max_batch
        }

        async fn query_batch(&self, packages: &[PackageId]) -> Result<Vec<PackageAdvisories>> {
            *self.attempts.lock().unwrap() += 1;
            if packages.iter().any(|p| p.name().as_str() == "down") {
                return Err(RemediationError::Network {
                    service: "test".to_string(),
                    details: "503".to_string(),
                }
                .into());
            }
            self.batch_sizes.lock().unwrap().push(packages.len());
            let mut results: Vec<PackageAdvisories> = packages
                .iter()
                .map(|p| match p.name().as_str() {
                    "partial" => Err("advisory GHSA-part details unavailable: 503".to_string()),
                    "bad" => Ok(vec![VulnerabilityRecord::new(
                        "GHSA-bad".to_string(),
                        "bad".to_string(),
                        "https://osv.dev/vulnerability/GHSA-bad".to_string(),
                        Some(9.8),
                        vec![AffectedRange::new(None, Some("2.0".to_string()), RangeKind::Ecosystem)],
                        vec![],
                    )]),
                    _ => Ok(vec![]),
                })
                .collect();
            if self.short_response {
                results.pop();
            }
            Ok(results)
        }
    }

    fn graph(names: &[&str]) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for (i, name) in names.iter().enumerate() {
            graph.add_node(
                PackageId::new(
                    PackageName::new(name).unwrap(),
                    PackageVersion::parse("1.0").unwrap(),
                ),
                i == 0,
                1,
            );
        }
        graph
    }

    fn settings(batch_size: usize) -> ScanSettings {
        ScanSettings {
            batch_size,
            throttle: Duration::ZERO,
            retry: RetryPolicy::new(2, Duration::from_millis(1)),
        }
    }

    #[tokio::test]
    async fn test_one_finding_per_node_in_order() {
        let source = ScriptedSource::new(1000);
        let report = ScanVulnerabilitiesUseCase::new(&source, &SilentReporter, settings(1000))
            .execute(graph(&["good", "bad", "fine"]))
            .await;

        let names: Vec<&str> = report.findings().iter().map(|f| f.package().as_str()).collect();
        assert_eq!(names, vec!["good", "bad", "fine"]);
        assert!(report.findings()[1].is_vulnerable());
        assert!(!report.findings()[0].is_vulnerable());
        assert!(report.findings()[0].is_direct());
        assert_eq!(report.graph().total_package_count(), 3);
    }

    #[tokio::test]
    async fn test_batches_respect_source_limit() {
        let source = ScriptedSource::new(2);
        ScanVulnerabilitiesUseCase::new(&source, &SilentReporter, settings(1000))
            .execute(graph(&["a", "b", "c", "d", "e"]))
            .await;
        assert_eq!(*source.batch_sizes.lock().unwrap(), vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn test_failed_batch_marks_only_its_members() {
        let source = ScriptedSource::new(2);
        let report = ScanVulnerabilitiesUseCase::new(&source, &SilentReporter, settings(2))
            .execute(graph(&["a", "down", "bad", "c"]))
            .await;

        let failed: Vec<&str> = report.failed().map(|f| f.package().as_str()).collect();
        assert_eq!(failed, vec!["a", "down"]);
        assert_eq!(report.vulnerable().count(), 1);
        // first batch: initial attempt + 2 retries; second batch: 1
        assert_eq!(*source.attempts.lock().unwrap(), 4);
    }

    #[tokio::test]
    async fn test_incomplete_entry_fails_only_that_package() {
        let source = ScriptedSource::new(1000);
        let report = ScanVulnerabilitiesUseCase::new(&source, &SilentReporter, settings(1000))
            .execute(graph(&["a", "partial", "bad"]))
            .await;

        let failed: Vec<&str> = report.failed().map(|f| f.package().as_str()).collect();
        assert_eq!(failed, vec!["partial"]);
        assert_eq!(report.vulnerable().count(), 1);
        assert!(!report.findings()[0].is_vulnerable());
        // package-level errors are not retried as a batch
        assert_eq!(*source.attempts.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_misaligned_response_fails_batch() {
        let mut source = ScriptedSource::new(1000);
        source.short_response = true;
        let report = ScanVulnerabilitiesUseCase::new(&source, &SilentReporter, settings(1000))
            .execute(graph(&["a", "bad"]))
            .await;

        assert_eq!(report.failed().count(), 2);
        assert_eq!(report.vulnerable().count(), 0);
    }

    #[test]
    fn test_chunk_size_never_zero() {
        let source = ScriptedSource::new(0);
        let use_case = ScanVulnerabilitiesUseCase::new(&source, &SilentReporter, settings(0));
        assert_eq!(use_case.chunk_size(), 1);
    }
}
