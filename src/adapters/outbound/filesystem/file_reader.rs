use crate::ports::outbound::ManifestReader;
use crate::shared::error::RemediationError;
use crate::shared::security::validate_regular_file;
use crate::shared::Result;
use std::fs;
use std::path::Path;

/// FileSystemReader adapter for reading manifests from the file system
///
/// Rejects symbolic links, non-regular files and oversized files before
/// reading.
pub struct FileSystemReader;

impl FileSystemReader {
    pub fn new() -> Self {
        Self
    }

    fn safe_read_file(&self, path: &Path) -> Result<String> {
        validate_regular_file(path, "manifest")?;
        fs::read_to_string(path).map_err(|e| anyhow::anyhow!("Failed to read manifest: {}", e))
    }
}

impl Default for FileSystemReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ManifestReader for FileSystemReader {
    fn read_manifest(&self, path: &Path) -> Result<String> {
        if !path.exists() {
            return Err(RemediationError::ManifestNotFound {
                path: path.to_path_buf(),
                suggestion: "Pass the path of a pip requirements file, e.g. `autoheal requirements.txt`."
                    .to_string(),
            }
            .into());
        }

        self.safe_read_file(path).map_err(|e| {
            RemediationError::FileReadError {
                path: path.to_path_buf(),
                details: e.to_string(),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_manifest_success() {
        let temp_dir = TempDir::new().unwrap();
        let manifest = temp_dir.path().join("requirements.txt");
        fs::write(&manifest, "requests==2.31.0\n").unwrap();

        let reader = FileSystemReader::new();
        let content = reader.read_manifest(&manifest).unwrap();
        assert_eq!(content, "requests==2.31.0\n");
    }

    #[test]
    fn test_read_manifest_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let reader = FileSystemReader::new();
        let err = reader
            .read_manifest(&temp_dir.path().join("missing.txt"))
            .unwrap_err();
        assert!(err.to_string().contains("Manifest file not found"));
    }

    #[test]
    fn test_read_manifest_directory_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let reader = FileSystemReader::new();
        let err = reader.read_manifest(temp_dir.path()).unwrap_err();
        assert!(err.to_string().contains("not a regular file"));
    }

    #[cfg(unix)]
    #[test]
    fn test_read_manifest_symlink_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("real.txt");
        let link = temp_dir.path().join("link.txt");
        fs::write(&target, "six==1.16.0\n").unwrap();
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let reader = FileSystemReader::new();
        let err = reader.read_manifest(&link).unwrap_err();
        assert!(err.to_string().contains("symbolic link"));
    }
}
