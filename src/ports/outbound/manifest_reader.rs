use crate::shared::Result;
use std::path::Path;

/// ManifestReader port for reading a pinned-dependency manifest
///
/// This port abstracts the file system so the parsing use case can be
/// exercised against in-memory manifests.
pub trait ManifestReader {
    /// Reads the whole manifest as UTF-8 text
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file does not exist or is not a regular file
    /// - The path is a symbolic link
    /// - The file exceeds the size limit or is not valid UTF-8
    fn read_manifest(&self, path: &Path) -> Result<String>;
}
