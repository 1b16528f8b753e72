use crate::ports::outbound::{ProgressReporter, VerificationOutcome, VerificationProcedure};
use crate::remediation::domain::{FixSelection, PatchOutcome};
use crate::remediation::services::{ManifestEditor, PinEdit};
use crate::shared::error::RemediationError;
use crate::shared::Result;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::{debug, info, warn};

const BASELINE_PREFIX: &str = ".autoheal-baseline-";
const SCRATCH_PREFIX: &str = ".autoheal-scratch-";

/// Result of a completed patch run
#[derive(Debug, Clone, PartialEq)]
pub struct PatchRun {
    /// One outcome per selection, in input order
    pub outcomes: Vec<PatchOutcome>,
    /// Final baseline content: the recommended manifest
    pub baseline: String,
}

/// PatchValidator - applies fixes one at a time against a verified baseline.
///
/// The baseline starts as a copy of the manifest and must pass verification
/// before any fix is tried. Each fix is written to a scratch copy of the
/// current baseline; a passing scratch copy is renamed over the baseline, a
/// failing one is deleted. The manifest itself is never written.
///
/// Baseline and scratch files live next to the manifest so relative
/// `-r`/`-c` includes keep resolving. All of them are removed when the run
/// ends, on every path.
pub struct PatchValidator<'a, V: VerificationProcedure, PR: ProgressReporter> {
    verifier: &'a V,
    progress_reporter: &'a PR,
}

impl<'a, V: VerificationProcedure, PR: ProgressReporter> PatchValidator<'a, V, PR> {
    pub fn new(verifier: &'a V, progress_reporter: &'a PR) -> Self {
        Self {
            verifier,
            progress_reporter,
        }
    }

    /// Runs the baseline check and then every selection, strictly in order.
    ///
    /// # Arguments
    /// * `manifest_path` - Original manifest; only its directory is used
    /// * `content` - Original manifest content
    /// * `selections` - Fixes to try
    ///
    /// # Errors
    /// `BaselineInvalid` when the unmodified manifest fails verification,
    /// `FileWriteError` when a working copy cannot be written.
    pub async fn run(
        &self,
        manifest_path: &Path,
        content: &str,
        selections: &[FixSelection],
    ) -> Result<PatchRun> {
        let work_dir = work_dir(manifest_path);
        let baseline = write_working_copy(&work_dir, BASELINE_PREFIX, content)?;

        self.progress_reporter
            .report("🧪 Verifying the unmodified manifest...");
        let verdict = self.verify(&baseline).await;
        if !verdict.passed {
            warn!(manifest = %manifest_path.display(), "Baseline failed verification");
            return Err(RemediationError::BaselineInvalid {
                path: manifest_path.to_path_buf(),
                diagnostics: verdict.diagnostics,
            }
            .into());
        }
        self.progress_reporter.report("✅ Baseline verified");

        let mut current = content.to_string();
        let mut outcomes = Vec::with_capacity(selections.len());

        for (index, selection) in selections.iter().enumerate() {
            self.progress_reporter.report_progress(
                index,
                selections.len(),
                Some(&format!("{} -> {}", selection.package(), selection.chosen())),
            );

            let (patched, edit) =
                ManifestEditor::apply_pin(&current, selection.package(), selection.chosen());
            if edit == PinEdit::Appended {
                debug!(package = %selection.package(), "No manifest line for package, appending pin");
            }

            let scratch = write_working_copy(&work_dir, SCRATCH_PREFIX, &patched)?;
            let verdict = self.verify(&scratch).await;

            if verdict.passed {
                scratch.persist(&*baseline).map_err(|e| RemediationError::FileWriteError {
                    path: baseline.to_path_buf(),
                    details: e.to_string(),
                })?;
                current = patched;
                info!(
                    package = %selection.package(),
                    from = %selection.current(),
                    to = %selection.chosen(),
                    "Fix committed"
                );
                outcomes.push(PatchOutcome::Committed);
            } else {
                let failure = RemediationError::PatchValidationFailure {
                    package: selection.package().to_string(),
                    from: selection.current().to_string(),
                    to: selection.chosen().to_string(),
                    diagnostics: verdict.diagnostics.clone(),
                };
                warn!(error = %failure, "Fix rejected");
                drop(scratch);
                outcomes.push(PatchOutcome::Rejected {
                    diagnostics: verdict.diagnostics,
                });
            }
        }

        self.progress_reporter.report_completion(&format!(
            "✅ Patch validation complete: {} of {} fix(es) committed",
            outcomes.iter().filter(|o| o.is_committed()).count(),
            outcomes.len()
        ));

        Ok(PatchRun {
            outcomes,
            baseline: current,
        })
    }

    /// A procedure that could not run counts as a failed verification
    async fn verify(&self, manifest: &Path) -> VerificationOutcome {
        match self.verifier.verify(manifest).await {
            Ok(outcome) => outcome,
            Err(e) => VerificationOutcome::failed(format!("verification procedure error: {:#}", e)),
        }
    }
}

fn work_dir(manifest_path: &Path) -> PathBuf {
    match manifest_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Writes `content` to a new hidden file in `dir`, deleted when dropped
fn write_working_copy(dir: &Path, prefix: &str, content: &str) -> Result<TempPath> {
    let to_error = |details: String| RemediationError::FileWriteError {
        path: dir.to_path_buf(),
        details,
    };

    let mut file = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(".txt")
        .tempfile_in(dir)
        .map_err(|e| to_error(e.to_string()))?;
    file.write_all(content.as_bytes())
        .and_then(|_| file.flush())
        .map_err(|e| to_error(e.to_string()))?;
    Ok(file.into_temp_path())
}
