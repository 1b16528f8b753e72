use autoheal::prelude::*;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Mock ArtifactWriter keeping artifacts in memory
#[derive(Default, Clone)]
pub struct MockArtifactWriter {
    written: Arc<Mutex<Vec<(Artifact, String)>>>,
}

impl MockArtifactWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, artifact: Artifact) -> Option<String> {
        self.written
            .lock()
            .unwrap()
            .iter()
            .find(|(a, _)| *a == artifact)
            .map(|(_, content)| content.clone())
    }

    pub fn count(&self) -> usize {
        self.written.lock().unwrap().len()
    }
}

impl ArtifactWriter for MockArtifactWriter {
    fn write_artifact(&self, artifact: Artifact, content: &str) -> Result<PathBuf> {
        self.written
            .lock()
            .unwrap()
            .push((artifact, content.to_string()));
        Ok(PathBuf::from("out").join(artifact.file_name()))
    }
}
