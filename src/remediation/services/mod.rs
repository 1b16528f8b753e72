pub mod candidate_matrix;
pub mod manifest_editor;
pub mod manifest_parser;
pub mod marker;
pub mod version_resolver;

pub use candidate_matrix::CandidateMatrixBuilder;
pub use manifest_editor::{ManifestEditor, PinEdit};
pub use manifest_parser::{ManifestParser, ParsedManifest, ParsedRequirement, SkippedLine, VersionSpec};
pub use marker::MarkerEnvironment;
pub use version_resolver::VersionResolver;
