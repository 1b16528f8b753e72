use crate::ports::outbound::{VerificationOutcome, VerificationProcedure};
use crate::shared::Result;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Placeholder replaced by the manifest path in every argument
pub const MANIFEST_PLACEHOLDER: &str = "{manifest}";

/// Runs a user-supplied command as the verification procedure.
///
/// Exit status 0 passes. A non-zero exit, a spawn failure and a timeout all
/// fail, with captured stdout and stderr as diagnostics.
pub struct CommandVerifier {
    argv: Vec<String>,
    timeout: Duration,
}

impl CommandVerifier {
    /// # Errors
    /// Fails when `argv` is empty.
    pub fn new(argv: Vec<String>, timeout: Duration) -> Result<Self> {
        if argv.first().map_or(true, |program| program.trim().is_empty()) {
            anyhow::bail!("Verification command must name a program");
        }
        Ok(Self { argv, timeout })
    }

    fn render_args(&self, manifest: &Path) -> Vec<String> {
        let manifest = manifest.to_string_lossy();
        self.argv
            .iter()
            .map(|arg| arg.replace(MANIFEST_PLACEHOLDER, &manifest))
            .collect()
    }
}

fn combine_output(stdout: &[u8], stderr: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);
    match (stdout.trim().is_empty(), stderr.trim().is_empty()) {
        (true, true) => String::new(),
        (false, true) => stdout.trim_end().to_string(),
        (true, false) => stderr.trim_end().to_string(),
        (false, false) => format!("{}\n{}", stdout.trim_end(), stderr.trim_end()),
    }
}

#[async_trait]
impl VerificationProcedure for CommandVerifier {
    async fn verify(&self, manifest: &Path) -> Result<VerificationOutcome> {
        let args = self.render_args(manifest);
        let Some((program, rest)) = args.split_first() else {
            return Ok(VerificationOutcome::failed("empty verification command"));
        };
        debug!(command = ?args, "Running verification command");

        let child = Command::new(program)
            .args(rest)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                warn!(program = %program, error = %e, "Failed to start verification command");
                return Ok(VerificationOutcome::failed(format!(
                    "failed to start '{}': {}",
                    program, e
                )));
            }
        };

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Ok(VerificationOutcome::failed(format!(
                    "failed to wait for '{}': {}",
                    program, e
                )))
            }
            Err(_) => {
                warn!(program = %program, timeout_secs = self.timeout.as_secs(), "Verification command timed out");
                return Ok(VerificationOutcome::failed(format!(
                    "'{}' timed out after {}s",
                    program,
                    self.timeout.as_secs()
                )));
            }
        };

        let diagnostics = combine_output(&output.stdout, &output.stderr);
        if output.status.success() {
            Ok(VerificationOutcome::passed(diagnostics))
        } else {
            let status = match output.status.code() {
                Some(code) => format!("exit status {}", code),
                None => "terminated by signal".to_string(),
            };
            Ok(VerificationOutcome::failed(if diagnostics.is_empty() {
                status
            } else {
                format!("{}\n{}", status, diagnostics)
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_command_rejected() {
        assert!(CommandVerifier::new(vec![], Duration::from_secs(1)).is_err());
        assert!(CommandVerifier::new(argv(&[" "]), Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_manifest_placeholder_substituted() {
        let verifier = CommandVerifier::new(
            argv(&["pip", "install", "-r", "{manifest}", "--dry-run"]),
            Duration::from_secs(1),
        )
        .unwrap();
        let rendered = verifier.render_args(&PathBuf::from("/tmp/req.txt"));
        assert_eq!(rendered[3], "/tmp/req.txt");
        assert_eq!(rendered[4], "--dry-run");
    }

    #[test]
    fn test_combine_output() {
        assert_eq!(combine_output(b"ok\n", b""), "ok");
        assert_eq!(combine_output(b"", b"boom\n"), "boom");
        assert_eq!(combine_output(b"a", b"b"), "a\nb");
    }

    #[tokio::test]
    async fn test_missing_program_fails_verification() {
        let verifier = CommandVerifier::new(
            argv(&["autoheal-definitely-not-a-real-program"]),
            Duration::from_secs(5),
        )
        .unwrap();
        let outcome = verifier.verify(Path::new("requirements.txt")).await.unwrap();
        assert!(!outcome.passed);
        assert!(outcome.diagnostics.contains("failed to start"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_status_decides_outcome() {
        let pass = CommandVerifier::new(argv(&["sh", "-c", "echo fine"]), Duration::from_secs(5))
            .unwrap();
        let outcome = pass.verify(Path::new("r.txt")).await.unwrap();
        assert!(outcome.passed);
        assert_eq!(outcome.diagnostics, "fine");

        let fail = CommandVerifier::new(
            argv(&["sh", "-c", "echo broken >&2; exit 3"]),
            Duration::from_secs(5),
        )
        .unwrap();
        let outcome = fail.verify(Path::new("r.txt")).await.unwrap();
        assert!(!outcome.passed);
        assert!(outcome.diagnostics.contains("exit status 3"));
        assert!(outcome.diagnostics.contains("broken"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_fails_verification() {
        let verifier =
            CommandVerifier::new(argv(&["sleep", "5"]), Duration::from_millis(100)).unwrap();
        let outcome = verifier.verify(Path::new("r.txt")).await.unwrap();
        assert!(!outcome.passed);
        assert!(outcome.diagnostics.contains("timed out"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_sees_manifest_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let manifest = dir.path().join("requirements.txt");
        std::fs::write(&manifest, "requests==2.31.0\n").unwrap();

        let verifier = CommandVerifier::new(
            argv(&["grep", "-q", "requests==2.31.0", "{manifest}"]),
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(verifier.verify(&manifest).await.unwrap().passed);
    }
}
