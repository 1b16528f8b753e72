use crate::shared::Result;
use async_trait::async_trait;
use std::path::Path;

/// Result of one run of the external verification procedure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationOutcome {
    pub passed: bool,
    /// Captured output, used as diagnostics when `passed` is false
    pub diagnostics: String,
}

impl VerificationOutcome {
    pub fn passed(diagnostics: impl Into<String>) -> Self {
        Self {
            passed: true,
            diagnostics: diagnostics.into(),
        }
    }

    pub fn failed(diagnostics: impl Into<String>) -> Self {
        Self {
            passed: false,
            diagnostics: diagnostics.into(),
        }
    }
}

/// VerificationProcedure port: builds and tests a project against a manifest
///
/// Treated as opaque. An `Err` means the procedure itself could not run and
/// is handled by callers the same way as a failed outcome.
#[async_trait]
pub trait VerificationProcedure: Send + Sync {
    async fn verify(&self, manifest: &Path) -> Result<VerificationOutcome>;
}
