use super::marker::MarkerEnvironment;
use crate::remediation::domain::{PackageName, PackageVersion};
use crate::shared::error::RemediationError;
use crate::shared::Result;
use pep440_rs::VersionSpecifiers;
use regex::Regex;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// How a requirement line states its version
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSpec {
    /// `==X` or `===X`; the version text is passed through unchanged
    Pinned(String),
    /// Any other specifier set; empty means "any version"
    Constraint(String),
}

/// A requirement declaration split into its parts
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRequirement {
    /// Requirement text with comments and per-line options removed
    pub raw: String,
    pub name: PackageName,
    pub extras: Vec<String>,
    pub spec: VersionSpec,
    pub marker: Option<String>,
}

/// A manifest line that was deliberately not turned into a requirement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    pub line_number: usize,
    pub text: String,
    pub reason: String,
}

/// Result of parsing a whole manifest
#[derive(Debug, Clone, Default)]
pub struct ParsedManifest {
    pub requirements: Vec<ParsedRequirement>,
    pub skipped: Vec<SkippedLine>,
}

fn requirement_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?P<name>[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)\s*(?:\[(?P<extras>[^\]]*)\])?\s*(?P<spec>.*)$",
        )
        .expect("requirement pattern is valid")
    })
}

/// Parses pip-style requirement manifests.
pub struct ManifestParser;

impl ManifestParser {
    /// Parses manifest content, keeping only lines that apply to `env`.
    ///
    /// # Errors
    /// Returns a validation error when a line is not a dependency
    /// declaration, when a pinned version is not valid PEP 440, or when no
    /// usable requirement remains.
    pub fn parse(content: &str, env: &MarkerEnvironment) -> Result<ParsedManifest> {
        let mut manifest = ParsedManifest::default();

        for (line_number, line) in Self::logical_lines(content) {
            let text = strip_comment(&line).trim().to_string();
            if text.is_empty() {
                continue;
            }

            if let Some(reason) = skip_reason(&text) {
                if reason.starts_with("option") {
                    debug!(line = line_number, text = %text, "Skipping manifest option line");
                } else {
                    warn!(line = line_number, text = %text, "Skipping {}", reason);
                }
                manifest.skipped.push(SkippedLine {
                    line_number,
                    text,
                    reason: reason.to_string(),
                });
                continue;
            }

            let requirement = Self::parse_requirement(&text).map_err(|e| {
                RemediationError::Validation {
                    message: format!("line {}: {}", line_number, root_message(&e)),
                }
            })?;

            if let Some(marker) = requirement.marker.as_deref() {
                let applies = env.evaluate(marker).map_err(|e| RemediationError::Validation {
                    message: format!("line {}: {}", line_number, root_message(&e)),
                })?;
                if !applies {
                    info!(line = line_number, marker, "Marker does not apply, dropping requirement");
                    manifest.skipped.push(SkippedLine {
                        line_number,
                        text,
                        reason: format!("marker '{}' does not apply", marker),
                    });
                    continue;
                }
            }

            manifest.requirements.push(requirement);
        }

        if manifest.requirements.is_empty() {
            return Err(RemediationError::Validation {
                message: "manifest contains no usable requirements".to_string(),
            }
            .into());
        }

        Ok(manifest)
    }

    /// Parses a single requirement such as `requests[socks]==2.31.0 ; python_version > "3.8"`.
    ///
    /// Also accepts the parenthesized specifier form found in package
    /// metadata (`charset-normalizer (<4,>=2)`).
    pub fn parse_requirement(text: &str) -> Result<ParsedRequirement> {
        let raw = strip_options(text).trim().to_string();
        let (requirement, marker) = match raw.split_once(';') {
            Some((req, marker)) => (req.trim(), Some(marker.trim().to_string())),
            None => (raw.as_str(), None),
        };

        let captures = requirement_regex().captures(requirement).ok_or_else(|| {
            RemediationError::Validation {
                message: format!("'{}' is not a dependency declaration", raw),
            }
        })?;

        let name = PackageName::new(&captures["name"])?;
        let extras = captures
            .name("extras")
            .map(|m| {
                m.as_str()
                    .split(',')
                    .map(|e| e.trim().to_string())
                    .filter(|e| !e.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let mut spec_text = captures["spec"].trim();
        if let Some(inner) = spec_text
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
        {
            spec_text = inner.trim();
        }
        let spec = parse_spec(spec_text, &raw)?;

        Ok(ParsedRequirement {
            raw,
            name,
            extras,
            spec,
            marker: marker.filter(|m| !m.is_empty()),
        })
    }

    /// Joins `\` continuations; each logical line keeps the 1-based number
    /// of its first physical line.
    pub fn logical_lines(content: &str) -> Vec<(usize, String)> {
        let mut lines = Vec::new();
        let mut current: Option<(usize, String)> = None;

        for (index, physical) in content.lines().enumerate() {
            let trimmed = physical.trim_end();
            let (body, continues) = match trimmed.strip_suffix('\\') {
                Some(body) => (body, true),
                None => (trimmed, false),
            };

            let entry = current.get_or_insert_with(|| (index + 1, String::new()));
            if !entry.1.is_empty() {
                entry.1.push(' ');
            }
            entry.1.push_str(body.trim());

            if !continues {
                lines.extend(current.take());
            }
        }
        lines.extend(current);
        lines
    }
}

fn parse_spec(spec_text: &str, raw: &str) -> Result<VersionSpec> {
    if spec_text.is_empty() {
        return Ok(VersionSpec::Constraint(String::new()));
    }

    for operator in ["===", "=="] {
        if let Some(version) = spec_text.strip_prefix(operator) {
            let version = version.trim();
            if !version.is_empty()
                && !version.contains(',')
                && !version.contains('*')
                && !version.starts_with('=')
            {
                PackageVersion::parse(version)?;
                return Ok(VersionSpec::Pinned(version.to_string()));
            }
        }
    }

    VersionSpecifiers::from_str(spec_text).map_err(|e| RemediationError::Validation {
        message: format!("'{}' has an invalid version specifier: {}", raw, e),
    })?;
    Ok(VersionSpec::Constraint(spec_text.to_string()))
}

/// `#` starts a comment at the beginning of a line or after whitespace
pub(crate) fn strip_comment(line: &str) -> &str {
    split_comment(line).0
}

/// Splits a line into (content, comment) where comment includes the
/// whitespace before `#`.
pub(crate) fn split_comment(line: &str) -> (&str, &str) {
    let bytes = line.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'#' && (i == 0 || bytes[i - 1].is_ascii_whitespace()) {
            let start = line[..i].trim_end().len();
            return (&line[..start], &line[start..]);
        }
    }
    (line, "")
}

/// Drops per-requirement options such as `--hash=sha256:...`
fn strip_options(text: &str) -> &str {
    match text.find(" --") {
        Some(index) => &text[..index],
        None => text,
    }
}

fn skip_reason(text: &str) -> Option<&'static str> {
    let lower = text.to_ascii_lowercase();
    if lower.starts_with("-e ") || lower.starts_with("--editable") {
        return Some("editable requirement");
    }
    if lower.starts_with('-') {
        return Some("option line");
    }
    let requirement = strip_options(&lower);
    if ["git+", "hg+", "svn+", "bzr+"]
        .iter()
        .any(|scheme| requirement.contains(scheme))
    {
        return Some("source-control requirement");
    }
    if requirement.contains("://") || requirement.contains(" @ ") {
        return Some("direct URL requirement");
    }
    None
}

fn root_message(error: &anyhow::Error) -> String {
    match error.downcast_ref::<RemediationError>() {
        Some(RemediationError::Validation { message }) => message.clone(),
        _ => error.to_string(),
    }
}
