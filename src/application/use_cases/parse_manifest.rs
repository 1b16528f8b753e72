use crate::ports::outbound::{ManifestReader, ReleaseRegistry};
use crate::remediation::domain::{PackageVersion, RequirementRecord};
use crate::remediation::services::{
    ManifestParser, MarkerEnvironment, SkippedLine, VersionResolver, VersionSpec,
};
use crate::shared::Result;
use anyhow::Context;
use std::path::Path;
use tracing::info;

/// Output of the manifest stage
#[derive(Debug, Clone)]
pub struct LoadedManifest {
    /// Manifest text as read; the starting baseline
    pub content: String,
    pub requirements: Vec<RequirementRecord>,
    pub skipped: Vec<SkippedLine>,
}

/// ParseManifestUseCase - reads a manifest and turns every applicable line
/// into a concrete, direct requirement.
///
/// Exact pins pass through unchanged. Constraints are resolved to the
/// highest matching release; a direct requirement that cannot be resolved
/// fails the run, since there is no version to scan.
pub struct ParseManifestUseCase<'a, M: ManifestReader, R: ReleaseRegistry> {
    reader: &'a M,
    resolver: &'a VersionResolver<R>,
    environment: &'a MarkerEnvironment,
}

impl<'a, M: ManifestReader, R: ReleaseRegistry> ParseManifestUseCase<'a, M, R> {
    pub fn new(
        reader: &'a M,
        resolver: &'a VersionResolver<R>,
        environment: &'a MarkerEnvironment,
    ) -> Self {
        Self {
            reader,
            resolver,
            environment,
        }
    }

    /// # Errors
    /// Read failures, validation errors from the parser, and resolution
    /// failures for unpinned direct requirements.
    pub async fn execute(&self, path: &Path) -> Result<LoadedManifest> {
        let content = self.reader.read_manifest(path)?;
        let parsed = ManifestParser::parse(&content, self.environment)?;

        let mut requirements = Vec::with_capacity(parsed.requirements.len());
        for requirement in parsed.requirements {
            let version = match &requirement.spec {
                VersionSpec::Pinned(version) => PackageVersion::parse(version)?,
                VersionSpec::Constraint(constraint) => {
                    let version = self
                        .resolver
                        .resolve(&requirement.name, constraint)
                        .await
                        .with_context(|| {
                            format!("Failed to resolve direct requirement '{}'", requirement.raw)
                        })?;
                    info!(
                        package = %requirement.name,
                        constraint = %constraint,
                        resolved = %version,
                        "Resolved unpinned requirement"
                    );
                    version
                }
            };
            requirements.push(RequirementRecord::new(
                requirement.raw,
                requirement.name,
                version,
            ));
        }

        Ok(LoadedManifest {
            content,
            requirements,
            skipped: parsed.skipped,
        })
    }
}
