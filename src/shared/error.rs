use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the CLI application.
///
/// These codes allow CI systems to distinguish between different
/// types of failures and successes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success - nothing vulnerable, or every vulnerable package was remediated
    Success = 0,
    /// Vulnerable packages remain after the run
    VulnerabilitiesRemain = 1,
    /// Invalid command-line arguments (clap parsing errors)
    InvalidArguments = 2,
    /// Application error (parse failure, invalid baseline, file I/O error, etc.)
    ApplicationError = 3,
}

impl ExitCode {
    /// Convert to i32 for use with std::process::exit
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitCode::Success => write!(f, "Success (0)"),
            ExitCode::VulnerabilitiesRemain => write!(f, "Vulnerabilities Remain (1)"),
            ExitCode::InvalidArguments => write!(f, "Invalid Arguments (2)"),
            ExitCode::ApplicationError => write!(f, "Application Error (3)"),
        }
    }
}

/// Application-specific errors for the remediation pipeline.
///
/// Parse-time and baseline errors are fatal to a run. Everything scoped to a
/// single node or package is isolated by the caller and reported alongside
/// the successful results.
#[derive(Debug, Error)]
pub enum RemediationError {
    #[error("Manifest file not found: {path}\n\n💡 Hint: {suggestion}")]
    ManifestNotFound { path: PathBuf, suggestion: String },

    /// Malformed manifest line or version string
    #[error("Validation error: {message}\n\n💡 Hint: Pin each requirement as 'name==X.Y.Z' with a PEP 440 version")]
    Validation { message: String },

    /// No published release satisfies a constraint
    #[error("No release of '{package}' satisfies '{constraint}'")]
    Resolution { package: String, constraint: String },

    /// Transient network failure, eligible for retry
    #[error("Network error while contacting {service}: {details}")]
    Network { service: String, details: String },

    /// Upstream payload did not have the expected shape
    #[error("Unexpected response from {service}: {details}")]
    DataFormat { service: String, details: String },

    /// A single package's fix failed verification
    #[error("Fix for {package} ({from} -> {to}) failed verification")]
    PatchValidationFailure {
        package: String,
        from: String,
        to: String,
        diagnostics: String,
    },

    /// The starting manifest itself fails verification
    #[error("Baseline manifest failed verification: {path}\n{diagnostics}\n\n💡 Hint: Fix the project so it builds and tests cleanly before remediating")]
    BaselineInvalid { path: PathBuf, diagnostics: String },

    #[error("Failed to read file: {path}\nDetails: {details}\n\n💡 Hint: Please verify that the file exists and you have read permissions")]
    FileReadError { path: PathBuf, details: String },

    #[error("Failed to write to file: {path}\nDetails: {details}\n\n💡 Hint: Please verify that the directory exists and you have write permissions")]
    FileWriteError { path: PathBuf, details: String },

    #[error("Security violation: {path}\nReason: {reason}\n\n💡 Hint: {hint}")]
    SecurityError {
        path: PathBuf,
        reason: String,
        hint: String,
    },
}

impl RemediationError {
    /// Whether the error is worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(self, RemediationError::Network { .. })
    }

    /// Returns true when an `anyhow::Error` wraps a transient `RemediationError`
    pub fn is_transient_error(error: &anyhow::Error) -> bool {
        error
            .downcast_ref::<RemediationError>()
            .map(RemediationError::is_transient)
            .unwrap_or(false)
    }

    /// Classifies a reqwest error raised while talking to `service`
    pub fn from_reqwest(service: &str, error: reqwest::Error) -> Self {
        if error.is_decode() {
            RemediationError::DataFormat {
                service: service.to_string(),
                details: error.to_string(),
            }
        } else {
            RemediationError::Network {
                service: service.to_string(),
                details: error.to_string(),
            }
        }
    }

    /// Classifies an unsuccessful HTTP status (404 must be handled by the caller)
    pub fn from_status(service: &str, status: reqwest::StatusCode) -> Self {
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            RemediationError::Network {
                service: service.to_string(),
                details: format!("status code {}", status),
            }
        } else {
            RemediationError::DataFormat {
                service: service.to_string(),
                details: format!("status code {}", status),
            }
        }
    }
}
