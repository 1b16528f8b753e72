use crate::application::dto::{RemediationReport, RemediationRequest};
use crate::shared::Result;
use async_trait::async_trait;

/// RemediationPort - Inbound port for a remediation run
///
/// This port defines the interface that external adapters (the CLI)
/// use to trigger a run. It represents the application's public API.
#[async_trait]
pub trait RemediationPort {
    /// Runs the pipeline for one manifest
    ///
    /// # Arguments
    /// * `request` - Manifest path and run options
    ///
    /// # Returns
    /// The full report, including isolated per-package issues
    ///
    /// # Errors
    /// Returns an error if:
    /// - The manifest cannot be read or parsed
    /// - An unpinned direct requirement cannot be resolved
    /// - The unmodified manifest fails verification
    /// - An artifact cannot be written
    async fn remediate(&self, request: RemediationRequest) -> Result<RemediationReport>;
}
