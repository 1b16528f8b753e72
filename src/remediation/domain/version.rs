use crate::shared::error::RemediationError;
use crate::shared::Result;
use pep440_rs::Version;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Maximum length for version strings (security limit)
const MAX_VERSION_LENGTH: usize = 100;

/// A version string that is valid under PEP 440.
///
/// Equality, hashing and ordering follow PEP 440 precedence, so `1.0` and
/// `1.0.0` are the same version. The original spelling is kept for display
/// and for writing pins back into a manifest.
#[derive(Debug, Clone)]
pub struct PackageVersion {
    raw: String,
    parsed: Version,
}

impl PackageVersion {
    /// Parses a version, failing with a validation error on malformed input
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(RemediationError::Validation {
                message: "Version string cannot be empty".to_string(),
            }
            .into());
        }

        if raw.len() > MAX_VERSION_LENGTH {
            return Err(RemediationError::Validation {
                message: format!(
                    "Version is too long ({} bytes). Maximum allowed: {} bytes",
                    raw.len(),
                    MAX_VERSION_LENGTH
                ),
            }
            .into());
        }

        let parsed = Version::from_str(raw).map_err(|e| RemediationError::Validation {
            message: format!("'{}' is not a valid PEP 440 version: {}", raw, e),
        })?;

        Ok(Self {
            raw: raw.to_string(),
            parsed,
        })
    }

    /// Parses a version, returning `None` for anything malformed
    pub fn try_parse(raw: &str) -> Option<Self> {
        Self::parse(raw).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Numeric release components (`1.2.3` -> `[1, 2, 3]`)
    pub fn release(&self) -> &[u64] {
        self.parsed.release()
    }

    pub fn is_prerelease(&self) -> bool {
        self.parsed.any_prerelease()
    }

    pub fn pep440(&self) -> &Version {
        &self.parsed
    }
}

impl PartialEq for PackageVersion {
    fn eq(&self, other: &Self) -> bool {
        self.parsed == other.parsed
    }
}

impl Eq for PackageVersion {}

impl Hash for PackageVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.parsed.hash(state);
    }
}

impl PartialOrd for PackageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.parsed.cmp(&other.parsed)
    }
}

impl std::fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl Serialize for PackageVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}
