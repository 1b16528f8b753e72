/// Use cases module containing application business logic orchestration
mod build_graph;
mod parse_manifest;
mod patch_validator;
mod remediate;
mod scan_vulnerabilities;

pub use build_graph::{BuildDependencyGraphUseCase, GraphBuild};
pub use parse_manifest::{LoadedManifest, ParseManifestUseCase};
pub use patch_validator::{PatchRun, PatchValidator};
pub use remediate::RemediateUseCase;
pub use scan_vulnerabilities::{ScanSettings, ScanVulnerabilitiesUseCase, DEFAULT_SCAN_THROTTLE_MS};
