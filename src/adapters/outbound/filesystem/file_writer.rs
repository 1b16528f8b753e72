use crate::ports::outbound::{Artifact, ArtifactWriter};
use crate::shared::error::RemediationError;
use crate::shared::Result;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// FileSystemWriter adapter for writing run artifacts into a directory
///
/// Each artifact is written to a temporary file in the output directory
/// and renamed into place, so a reader never sees a half-written file.
pub struct FileSystemWriter {
    output_dir: PathBuf,
}

impl FileSystemWriter {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn write_error(path: &Path, details: impl Into<String>) -> anyhow::Error {
        RemediationError::FileWriteError {
            path: path.to_path_buf(),
            details: details.into(),
        }
        .into()
    }

    /// Creates the output directory if needed and rejects symlinked targets
    fn prepare_destination(&self, path: &Path) -> Result<()> {
        if let Ok(metadata) = fs::symlink_metadata(&self.output_dir) {
            if metadata.is_symlink() {
                return Err(Self::write_error(
                    &self.output_dir,
                    "Security: Output directory is a symbolic link. For security reasons, writing through symbolic links is not allowed.",
                ));
            }
            if !metadata.is_dir() {
                return Err(Self::write_error(
                    &self.output_dir,
                    "Output path exists and is not a directory",
                ));
            }
        } else {
            fs::create_dir_all(&self.output_dir)
                .map_err(|e| Self::write_error(&self.output_dir, e.to_string()))?;
        }

        if let Ok(metadata) = fs::symlink_metadata(path) {
            if metadata.is_symlink() {
                return Err(Self::write_error(
                    path,
                    "Security: Output path is a symbolic link. For security reasons, writing to symbolic links is not allowed.",
                ));
            }
        }
        Ok(())
    }
}

impl ArtifactWriter for FileSystemWriter {
    fn write_artifact(&self, artifact: Artifact, content: &str) -> Result<PathBuf> {
        let path = self.output_dir.join(artifact.file_name());
        self.prepare_destination(&path)?;

        let mut temp = tempfile::NamedTempFile::new_in(&self.output_dir)
            .map_err(|e| Self::write_error(&path, e.to_string()))?;
        temp.write_all(content.as_bytes())
            .map_err(|e| Self::write_error(&path, e.to_string()))?;
        temp.persist(&path)
            .map_err(|e| Self::write_error(&path, e.error.to_string()))?;

        Ok(path)
    }
}
