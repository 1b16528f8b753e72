/// Outbound ports (Driven ports) - Infrastructure interfaces
///
/// These ports define the interfaces that the remediation core uses
/// to interact with external systems (file system, registries, advisory
/// databases, the verification procedure, the console).
pub mod artifact_writer;
pub mod manifest_reader;
pub mod metadata_source;
pub mod progress_reporter;
pub mod reasoning_client;
pub mod release_registry;
pub mod verification;
pub mod vulnerability_source;

pub use artifact_writer::{Artifact, ArtifactWriter};
pub use manifest_reader::ManifestReader;
pub use metadata_source::{
    DeclaredDependency, DeclaredRequirement, DependencyMetadataSource, MetadataFetcher,
};
pub use progress_reporter::ProgressReporter;
pub use reasoning_client::{ReasoningClient, ReasoningRequest, ReasoningResponse};
pub use release_registry::ReleaseRegistry;
pub use verification::{VerificationOutcome, VerificationProcedure};
pub use vulnerability_source::{PackageAdvisories, VulnerabilitySource};
