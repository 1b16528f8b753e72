pub mod candidate;
pub mod dependency_graph;
pub mod fix;
pub mod issue;
pub mod requirement;
pub mod run_metadata;
pub mod version;
pub mod vulnerability;

pub use candidate::{CandidateRow, DependencyType};
pub use dependency_graph::{DependencyEdge, DependencyGraph, PackageId, PackageNode};
pub use fix::{FixDecision, FixMatrixRow, FixSelection, PatchOutcome};
pub use issue::{Issue, Stage};
pub use requirement::{PackageName, RequirementRecord};
pub use run_metadata::RunMetadata;
pub use version::PackageVersion;
pub use vulnerability::{
    max_severity, AffectedRange, Finding, RangeKind, ScanStatus, VulnerabilityRecord,
    VulnerabilityReport,
};
