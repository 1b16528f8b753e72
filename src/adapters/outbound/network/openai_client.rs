use super::http;
use crate::ports::outbound::{ReasoningClient, ReasoningRequest, ReasoningResponse};
use crate::shared::error::RemediationError;
use crate::shared::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const SERVICE: &str = "reasoning API";
const TOOL_NAME: &str = "choose_fix";

/// OpenAI-compatible chat-completions client that answers fix selections
/// through a forced `choose_fix` tool call.
pub struct OpenAiReasoningClient {
    client: reqwest::Client,
    api_base: String,
    model: String,
    api_key: String,
}

impl OpenAiReasoningClient {
    pub const DEFAULT_API_BASE: &'static str = "https://api.openai.com/v1";
    pub const DEFAULT_MODEL: &'static str = "gpt-4o";
    pub const DEFAULT_API_KEY_ENV: &'static str = "OPENAI_API_KEY";
    const TIMEOUT_SECONDS: u64 = 60;

    /// Reads the API key from `api_key_env`.
    ///
    /// # Errors
    /// Fails when the variable is unset or empty.
    pub fn from_env(api_base: &str, model: &str, api_key_env: &str) -> Result<Self> {
        let api_key = std::env::var(api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Delegated selection needs an API key in ${}\n\n💡 Hint: Export the key or use --strategy nearest",
                    api_key_env
                )
            })?;
        Self::new(api_base, model, api_key)
    }

    pub fn new(api_base: &str, model: &str, api_key: String) -> Result<Self> {
        Ok(Self {
            client: http::build_client(Duration::from_secs(Self::TIMEOUT_SECONDS))?,
            api_base: api_base.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        })
    }

    fn prompt(request: &ReasoningRequest) -> String {
        let mut prompt = format!(
            "Package `{}` (current: {}) has vulnerabilities",
            request.package, request.current_version
        );
        if let Some(severity) = request.max_severity {
            prompt.push_str(&format!(" (max CVSS {:.1})", severity));
        }
        if !request.advisories.is_empty() {
            prompt.push_str(&format!(": {}", request.advisories.join(", ")));
        }
        prompt.push_str(".\nChoose the closest safe upgrade version unless there's a strong reason to go higher.\nCandidates:\n");
        for candidate in &request.candidates {
            prompt.push_str(&format!("- {}\n", candidate));
        }
        prompt.push_str("\nRespond with your decision and rationale.");
        prompt
    }

    fn body(&self, request: &ReasoningRequest) -> serde_json::Value {
        json!({
            "model": self.model,
            "messages": [{"role": "user", "content": Self::prompt(request)}],
            "tools": [{
                "type": "function",
                "function": {
                    "name": TOOL_NAME,
                    "description": "Select the best version upgrade for a vulnerable package based on severity, version distance, and safety.",
                    "parameters": {
                        "type": "object",
                        "properties": {
                            "package": {"type": "string", "description": "Name of the package to upgrade."},
                            "chosen_version": {"type": "string", "description": "Selected safe upgrade version."},
                            "rationale": {"type": "string", "description": "Justification for the chosen version."}
                        },
                        "required": ["package", "chosen_version", "rationale"],
                        "additionalProperties": false
                    }
                }
            }],
            "tool_choice": {"type": "function", "function": {"name": TOOL_NAME}}
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    arguments: String,
}

/// Pulls the `choose_fix` arguments out of a completion
fn extract_choice(completion: ChatCompletion) -> Result<ReasoningResponse> {
    let call = completion
        .choices
        .into_iter()
        .flat_map(|c| c.message.tool_calls)
        .find(|t| t.function.name == TOOL_NAME)
        .ok_or_else(|| RemediationError::DataFormat {
            service: SERVICE.to_string(),
            details: format!("response contains no {} call", TOOL_NAME),
        })?;

    serde_json::from_str(&call.function.arguments).map_err(|e| {
        RemediationError::DataFormat {
            service: SERVICE.to_string(),
            details: format!("{} arguments: {}", TOOL_NAME, e),
        }
        .into()
    })
}

#[async_trait]
impl ReasoningClient for OpenAiReasoningClient {
    async fn choose_fix(&self, request: &ReasoningRequest) -> Result<ReasoningResponse> {
        let url = format!("{}/chat/completions", self.api_base);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.body(request))
            .send()
            .await
            .map_err(|e| RemediationError::from_reqwest(SERVICE, e))?;

        if !response.status().is_success() {
            return Err(RemediationError::from_status(SERVICE, response.status()).into());
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| RemediationError::from_reqwest(SERVICE, e))?;
        extract_choice(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ReasoningRequest {
        ReasoningRequest {
            package: "jinja2".to_string(),
            current_version: "2.10".to_string(),
            candidates: vec!["2.10.1".to_string(), "2.11.3".to_string()],
            max_severity: Some(7.5),
            advisories: vec!["GHSA-462w-v97r-4m45".to_string()],
        }
    }

    #[test]
    fn test_prompt_lists_candidates() {
        let prompt = OpenAiReasoningClient::prompt(&request());
        assert!(prompt.contains("`jinja2` (current: 2.10)"));
        assert!(prompt.contains("max CVSS 7.5"));
        assert!(prompt.contains("- 2.10.1\n- 2.11.3\n"));
    }

    #[test]
    fn test_body_forces_tool_call() {
        let client =
            OpenAiReasoningClient::new("https://example.invalid/v1", "gpt-4o", "k".to_string())
                .unwrap();
        let body = client.body(&request());
        assert_eq!(body["tool_choice"]["function"]["name"], "choose_fix");
        assert_eq!(body["model"], "gpt-4o");
    }

    #[test]
    fn test_extract_choice() {
        let completion: ChatCompletion = serde_json::from_str(
            r#"{"choices": [{"message": {"tool_calls": [{"function": {
                "name": "choose_fix",
                "arguments": "{\"package\": \"jinja2\", \"chosen_version\": \"2.10.1\", \"rationale\": \"patch release\"}"
            }}]}}]}"#,
        )
        .unwrap();
        let choice = extract_choice(completion).unwrap();
        assert_eq!(choice.chosen_version, "2.10.1");
        assert_eq!(choice.rationale, "patch release");
    }

    #[test]
    fn test_missing_tool_call_is_data_format_error() {
        let completion: ChatCompletion =
            serde_json::from_str(r#"{"choices": [{"message": {"content": "hi"}}]}"#).unwrap();
        let err = extract_choice(completion).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RemediationError>(),
            Some(RemediationError::DataFormat { .. })
        ));
    }

    #[test]
    fn test_from_env_requires_key() {
        let result = OpenAiReasoningClient::from_env(
            OpenAiReasoningClient::DEFAULT_API_BASE,
            OpenAiReasoningClient::DEFAULT_MODEL,
            "AUTOHEAL_TEST_KEY_THAT_IS_NEVER_SET",
        );
        assert!(result.is_err());
    }
}
