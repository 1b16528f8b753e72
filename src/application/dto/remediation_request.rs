use std::path::PathBuf;

/// RemediationRequest - Internal request DTO for the remediation use case
#[derive(Debug, Clone)]
pub struct RemediationRequest {
    /// Path to the pinned-dependency manifest
    pub manifest_path: PathBuf,
    /// Stop after the candidate matrix; no selection or patching
    pub scan_only: bool,
    /// Advisory ids (or aliases) to drop from findings
    pub ignore_vulns: Vec<String>,
}

impl RemediationRequest {
    pub fn new(manifest_path: PathBuf, scan_only: bool, ignore_vulns: Vec<String>) -> Self {
        Self {
            manifest_path,
            scan_only,
            ignore_vulns,
        }
    }
}
