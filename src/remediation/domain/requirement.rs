use super::PackageVersion;
use crate::shared::error::RemediationError;
use crate::shared::Result;
use serde::Serialize;

/// Maximum length for package names (security limit)
const MAX_PACKAGE_NAME_LENGTH: usize = 255;

/// Canonical package name (PEP 503 normalized: lowercase, with runs of
/// `-`, `_` and `.` collapsed into a single `-`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PackageName(String);

impl PackageName {
    pub fn new(name: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RemediationError::Validation {
                message: "Package name cannot be empty".to_string(),
            }
            .into());
        }

        if name.len() > MAX_PACKAGE_NAME_LENGTH {
            return Err(RemediationError::Validation {
                message: format!(
                    "Package name is too long ({} bytes). Maximum allowed: {} bytes",
                    name.len(),
                    MAX_PACKAGE_NAME_LENGTH
                ),
            }
            .into());
        }

        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err(RemediationError::Validation {
                message: format!(
                    "Package name '{}' contains invalid characters. Only ASCII letters, digits, hyphens, underscores and dots are allowed.",
                    name
                ),
            }
            .into());
        }

        Ok(Self(Self::canonicalize(name)))
    }

    fn canonicalize(name: &str) -> String {
        let mut out = String::with_capacity(name.len());
        let mut in_separator = false;
        for c in name.chars() {
            if c == '-' || c == '_' || c == '.' {
                if !in_separator {
                    out.push('-');
                }
                in_separator = true;
            } else {
                out.push(c.to_ascii_lowercase());
                in_separator = false;
            }
        }
        out
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PackageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One usable line of the manifest after parsing and resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequirementRecord {
    raw: String,
    name: PackageName,
    version: PackageVersion,
    is_direct: bool,
}

impl RequirementRecord {
    pub fn new(raw: String, name: PackageName, version: PackageVersion) -> Self {
        Self {
            raw,
            name,
            version,
            is_direct: true,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn name(&self) -> &PackageName {
        &self.name
    }

    pub fn version(&self) -> &PackageVersion {
        &self.version
    }

    pub fn is_direct(&self) -> bool {
        self.is_direct
    }
}
