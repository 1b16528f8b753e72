use crate::shared::Result;
use std::path::PathBuf;

/// Files produced by a remediation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    VulnerabilityReport,
    CandidateMatrix,
    FixMatrix,
    RecommendedManifest,
}

impl Artifact {
    pub fn file_name(&self) -> &'static str {
        match self {
            Artifact::VulnerabilityReport => "vulnerability_report.json",
            Artifact::CandidateMatrix => "candidate_matrix.json",
            Artifact::FixMatrix => "fix_matrix.json",
            Artifact::RecommendedManifest => "requirements.recommended.txt",
        }
    }
}

/// ArtifactWriter port for persisting run outputs
pub trait ArtifactWriter {
    /// Writes `content` as `artifact`, returning where it was stored
    ///
    /// # Errors
    /// Returns an error if the destination cannot be created or written.
    fn write_artifact(&self, artifact: Artifact, content: &str) -> Result<PathBuf>;
}
