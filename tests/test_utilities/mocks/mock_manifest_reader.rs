use autoheal::prelude::*;
use std::path::Path;

/// Mock ManifestReader serving fixed content for any path
pub struct MockManifestReader {
    content: Option<String>,
}

impl MockManifestReader {
    pub fn new(content: &str) -> Self {
        Self {
            content: Some(content.to_string()),
        }
    }

    pub fn missing() -> Self {
        Self { content: None }
    }
}

impl ManifestReader for MockManifestReader {
    fn read_manifest(&self, path: &Path) -> Result<String> {
        self.content.clone().ok_or_else(|| {
            RemediationError::ManifestNotFound {
                path: path.to_path_buf(),
                suggestion: "Check the manifest path".to_string(),
            }
            .into()
        })
    }
}
