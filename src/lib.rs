//! autoheal - vulnerability remediation for pinned Python requirements
//!
//! This library reads a requirements manifest, resolves its full dependency
//! graph, scans every package against an advisory database, proposes upgrade
//! candidates, selects one fix per vulnerable package, and validates each fix
//! transactionally against a user-supplied verification command.
//!
//! # Architecture
//!
//! The library is organized into the following layers:
//!
//! - **Domain Layer** (`remediation`): Pure business logic and domain models
//! - **Application Layer** (`application`): Use cases and application services
//! - **Ports** (`ports`): Interface definitions for infrastructure
//! - **Adapters** (`adapters`): Concrete implementations of ports
//! - **Shared** (`shared`): Common utilities and error types
//!
//! # Example
//!
//! ```no_run
//! use autoheal::prelude::*;
//! use std::path::PathBuf;
//! use std::time::Duration;
//!
//! # async fn run() -> Result<()> {
//! // Create adapters
//! let environment = MarkerEnvironment::current();
//! let registry = CachingReleaseRegistry::new(RetryingReleaseRegistry::new(
//!     PyPiClient::new()?,
//!     RetryPolicy::default(),
//! ));
//! let metadata_source = DepsDevDependencySource::new(CachedFetcher::new(
//!     DepsDevClient::new()?,
//!     DiskCache::new(PathBuf::from(".autoheal_cache"))?,
//! ));
//! let verifier = CommandVerifier::new(
//!     vec!["pip".into(), "install".into(), "--dry-run".into(), "-r".into(), "{manifest}".into()],
//!     Duration::from_secs(600),
//! )?;
//!
//! // Create use case
//! let use_case = RemediateUseCase::new(
//!     FileSystemReader::new(),
//!     VersionResolver::new(registry),
//!     metadata_source,
//!     OsvClient::new()?,
//!     Some(verifier),
//!     FileSystemWriter::new(PathBuf::from("autoheal-out")),
//!     StderrProgressReporter::new(),
//! )
//! .with_environment(environment);
//!
//! // Execute
//! let request = RemediationRequest::new(PathBuf::from("requirements.txt"), false, vec![]);
//! let report = use_case.execute(request).await?;
//!
//! // Present summary
//! print!("{}", SummaryFormatter::new(false).render(&report));
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod application;
pub mod cli;
pub mod config;
pub mod ports;
pub mod remediation;
pub mod shared;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::adapters::outbound::console::{StderrProgressReporter, SummaryFormatter};
    pub use crate::adapters::outbound::filesystem::{DiskCache, FileSystemReader, FileSystemWriter};
    pub use crate::adapters::outbound::network::{
        CachedFetcher, CachingReleaseRegistry, DepsDevClient, DepsDevDependencySource,
        FallbackMetadataSource, OsvClient, PyPiClient, PyPiDependencySource, RetryingFetcher,
        RetryingReleaseRegistry,
    };
    pub use crate::adapters::outbound::process::CommandVerifier;
    pub use crate::application::dto::{RemediationReport, RemediationRequest, SelectionStrategy};
    pub use crate::application::factories::{FixSelectorFactory, ReasoningOptions};
    pub use crate::application::use_cases::RemediateUseCase;
    pub use crate::ports::inbound::RemediationPort;
    pub use crate::ports::outbound::{
        Artifact, ArtifactWriter, DependencyMetadataSource, ManifestReader, MetadataFetcher,
        PackageAdvisories, ProgressReporter, ReleaseRegistry, VerificationOutcome,
        VerificationProcedure, VulnerabilitySource,
    };
    pub use crate::remediation::domain::{
        CandidateRow, DependencyGraph, Finding, FixMatrixRow, PackageId, PackageName,
        PackageVersion, PatchOutcome, VulnerabilityReport,
    };
    pub use crate::remediation::policies::{FixSelector, NearestVersionSelector};
    pub use crate::remediation::services::{
        CandidateMatrixBuilder, ManifestParser, MarkerEnvironment, VersionResolver,
    };
    pub use crate::shared::error::{ExitCode, RemediationError};
    pub use crate::shared::{Result, RetryPolicy};
}
