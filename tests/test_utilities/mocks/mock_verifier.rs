use async_trait::async_trait;
use autoheal::prelude::*;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Mock VerificationProcedure failing any manifest that contains one of
/// the poison pins; records every manifest it was asked to verify
#[derive(Default, Clone)]
pub struct MockVerifier {
    poison: Vec<String>,
    pub seen: Arc<Mutex<Vec<String>>>,
}

impl MockVerifier {
    pub fn new(poison: &[&str]) -> Self {
        Self {
            poison: poison.iter().map(|p| p.to_string()).collect(),
            seen: Arc::default(),
        }
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl VerificationProcedure for MockVerifier {
    async fn verify(&self, manifest: &Path) -> Result<VerificationOutcome> {
        let content = std::fs::read_to_string(manifest)?;
        self.seen.lock().unwrap().push(content.clone());
        match self.poison.iter().find(|p| content.contains(p.as_str())) {
            Some(p) => Ok(VerificationOutcome::failed(format!(
                "ERROR: Cannot install {}",
                p
            ))),
            None => Ok(VerificationOutcome::passed("ok")),
        }
    }
}
