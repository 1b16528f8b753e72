/// Mock implementations for testing
mod mock_artifact_writer;
mod mock_manifest_reader;
mod mock_metadata_source;
mod mock_progress_reporter;
mod mock_release_registry;
mod mock_verifier;
mod mock_vulnerability_source;

pub use mock_artifact_writer::MockArtifactWriter;
pub use mock_manifest_reader::MockManifestReader;
pub use mock_metadata_source::{MockMetadataFetcher, MockMetadataSource};
pub use mock_progress_reporter::MockProgressReporter;
pub use mock_release_registry::MockReleaseRegistry;
pub use mock_verifier::MockVerifier;
pub use mock_vulnerability_source::MockVulnerabilitySource;
