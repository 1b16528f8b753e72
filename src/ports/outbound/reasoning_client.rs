use crate::shared::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Context handed to the reasoning collaborator for one package
#[derive(Debug, Clone, Serialize)]
pub struct ReasoningRequest {
    pub package: String,
    pub current_version: String,
    /// Ascending, all strictly above `current_version`
    pub candidates: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_severity: Option<f32>,
    pub advisories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReasoningResponse {
    pub chosen_version: String,
    pub rationale: String,
}

/// ReasoningClient port for delegated fix selection
#[async_trait]
pub trait ReasoningClient: Send + Sync {
    async fn choose_fix(&self, request: &ReasoningRequest) -> Result<ReasoningResponse>;
}
