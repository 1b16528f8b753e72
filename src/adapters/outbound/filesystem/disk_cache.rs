use crate::remediation::domain::PackageId;
use crate::shared::error::RemediationError;
use crate::shared::security::validate_path_component;
use crate::shared::Result;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// DiskCache adapter: one JSON file per (name, version) key
///
/// Entries are written to a temporary file and renamed into place, so
/// concurrent writers of the same key resolve as last writer wins. A
/// missing or unreadable entry is a miss, never an error.
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    /// Opens (and creates if needed) a cache rooted at `dir`
    pub fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).map_err(|e| RemediationError::FileWriteError {
            path: dir.clone(),
            details: format!("Failed to create cache directory: {}", e),
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Opens a cache in a subdirectory, for payloads of another service
    /// keyed by the same (name, version) pairs
    pub fn namespace(&self, name: &str) -> Result<Self> {
        validate_path_component(name, "Cache namespace")?;
        Self::new(self.dir.join(name))
    }

    fn entry_path(&self, key: &PackageId) -> Result<PathBuf> {
        let name = key.name().as_str();
        let version = key.version().as_str();
        validate_path_component(name, "Package name")?;
        validate_path_component(version, "Version")?;
        Ok(self.dir.join(format!("{}=={}.json", name, version)))
    }

    /// Returns the stored payload, or `None` on a miss
    pub fn get(&self, key: &PackageId) -> Option<serde_json::Value> {
        let path = self.entry_path(key).ok()?;
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(_) => {
                debug!(key = %key, "Metadata cache miss");
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %key, error = %e, "Ignoring corrupt metadata cache entry");
                None
            }
        }
    }

    /// Stores a payload, replacing any existing entry
    pub fn put(&self, key: &PackageId, value: &serde_json::Value) -> Result<()> {
        let path = self.entry_path(key)?;
        let write_error = |details: String| RemediationError::FileWriteError {
            path: path.clone(),
            details,
        };

        let mut temp =
            tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| write_error(e.to_string()))?;
        serde_json::to_writer(&mut temp, value).map_err(|e| write_error(e.to_string()))?;
        temp.flush().map_err(|e| write_error(e.to_string()))?;
        temp.persist(&path)
            .map_err(|e| write_error(e.error.to_string()))?;
        Ok(())
    }
}
