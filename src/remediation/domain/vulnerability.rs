use super::{DependencyGraph, PackageId, PackageName, PackageVersion};
use serde::{Serialize, Serializer};

/// How an affected range expresses its bounds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeKind {
    Ecosystem,
    Semver,
    Git,
    Other(String),
}

impl RangeKind {
    pub fn as_str(&self) -> &str {
        match self {
            RangeKind::Ecosystem => "ECOSYSTEM",
            RangeKind::Semver => "SEMVER",
            RangeKind::Git => "GIT",
            RangeKind::Other(kind) => kind,
        }
    }

    /// Commit-based ranges carry hashes instead of versions
    pub fn is_version_based(&self) -> bool {
        !matches!(self, RangeKind::Git)
    }
}

impl From<&str> for RangeKind {
    fn from(value: &str) -> Self {
        match value.to_uppercase().as_str() {
            "ECOSYSTEM" => RangeKind::Ecosystem,
            "SEMVER" => RangeKind::Semver,
            "GIT" => RangeKind::Git,
            other => RangeKind::Other(other.to_string()),
        }
    }
}

impl Serialize for RangeKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One contiguous vulnerable span from an advisory
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AffectedRange {
    pub introduced: Option<String>,
    pub fixed: Option<String>,
    pub kind: RangeKind,
}

impl AffectedRange {
    pub fn new(introduced: Option<String>, fixed: Option<String>, kind: RangeKind) -> Self {
        Self {
            introduced,
            fixed,
            kind,
        }
    }
}

/// Advisory matched against a package version
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VulnerabilityRecord {
    id: String,
    summary: String,
    details_url: String,
    max_severity: Option<f32>,
    ranges: Vec<AffectedRange>,
    aliases: Vec<String>,
}

impl VulnerabilityRecord {
    pub fn new(
        id: String,
        summary: String,
        details_url: String,
        max_severity: Option<f32>,
        ranges: Vec<AffectedRange>,
        aliases: Vec<String>,
    ) -> Self {
        Self {
            id,
            summary,
            details_url,
            max_severity,
            ranges,
            aliases,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn details_url(&self) -> &str {
        &self.details_url
    }

    pub fn max_severity(&self) -> Option<f32> {
        self.max_severity
    }

    pub fn ranges(&self) -> &[AffectedRange] {
        &self.ranges
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// True when `id` names this advisory directly or through an alias
    pub fn is_known_as(&self, id: &str) -> bool {
        self.id.eq_ignore_ascii_case(id) || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(id))
    }
}

/// Folds severity entries into a single maximum. Entries that are not
/// numeric are ignored.
pub fn max_severity<I>(scores: I) -> Option<f32>
where
    I: IntoIterator<Item = Option<f32>>,
{
    scores
        .into_iter()
        .flatten()
        .filter(|s| s.is_finite())
        .fold(None, |acc: Option<f32>, s| Some(acc.map_or(s, |a| a.max(s))))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanStatus {
    Scanned,
    /// The lookup itself failed; distinct from "no vulnerabilities"
    Failed { error: String },
}

/// Scan result for one graph node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    package: PackageName,
    current: PackageVersion,
    is_direct: bool,
    vulns: Vec<VulnerabilityRecord>,
    #[serde(flatten)]
    status: ScanStatus,
}

impl Finding {
    pub fn scanned(id: &PackageId, is_direct: bool, vulns: Vec<VulnerabilityRecord>) -> Self {
        Self {
            package: id.name().clone(),
            current: id.version().clone(),
            is_direct,
            vulns,
            status: ScanStatus::Scanned,
        }
    }

    pub fn failed(id: &PackageId, is_direct: bool, error: String) -> Self {
        Self {
            package: id.name().clone(),
            current: id.version().clone(),
            is_direct,
            vulns: Vec::new(),
            status: ScanStatus::Failed { error },
        }
    }

    pub fn package(&self) -> &PackageName {
        &self.package
    }

    pub fn current(&self) -> &PackageVersion {
        &self.current
    }

    pub fn is_direct(&self) -> bool {
        self.is_direct
    }

    pub fn vulns(&self) -> &[VulnerabilityRecord] {
        &self.vulns
    }

    pub fn status(&self) -> &ScanStatus {
        &self.status
    }

    pub fn is_vulnerable(&self) -> bool {
        !self.vulns.is_empty()
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, ScanStatus::Failed { .. })
    }

    /// Highest severity across all matched advisories
    pub fn max_severity(&self) -> Option<f32> {
        max_severity(self.vulns.iter().map(|v| v.max_severity()))
    }

    /// Drops advisories whose id or alias is listed; returns the dropped ids
    pub fn without_advisories(mut self, ignored: &[String]) -> (Self, Vec<String>) {
        let mut dropped = Vec::new();
        self.vulns.retain(|v| {
            let ignore = ignored.iter().any(|id| v.is_known_as(id));
            if ignore {
                dropped.push(v.id().to_string());
            }
            !ignore
        });
        (self, dropped)
    }
}

/// Hand-off artifact between scanning and remediation
#[derive(Debug, Clone, Serialize)]
pub struct VulnerabilityReport {
    findings: Vec<Finding>,
    graph: DependencyGraph,
}

impl VulnerabilityReport {
    pub fn new(findings: Vec<Finding>, graph: DependencyGraph) -> Self {
        Self { findings, graph }
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn vulnerable(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.is_vulnerable())
    }

    pub fn failed(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.is_failed())
    }

    /// (total advisories, vulnerable packages)
    pub fn summarize(&self) -> (usize, usize) {
        let total = self.findings.iter().map(|f| f.vulns.len()).sum();
        (total, self.vulnerable().count())
    }

    /// Filters every finding through [`Finding::without_advisories`].
    /// The dropped ids come back sorted and deduplicated.
    pub fn without_advisories(self, ignored: &[String]) -> (Self, Vec<String>) {
        if ignored.is_empty() {
            return (self, Vec::new());
        }
        let mut dropped = Vec::new();
        let findings = self
            .findings
            .into_iter()
            .map(|finding| {
                let (finding, ids) = finding.without_advisories(ignored);
                dropped.extend(ids);
                finding
            })
            .collect();
        dropped.sort();
        dropped.dedup();
        (Self::new(findings, self.graph), dropped)
    }
}
