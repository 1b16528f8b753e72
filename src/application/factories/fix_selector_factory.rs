use crate::adapters::outbound::network::OpenAiReasoningClient;
use crate::application::dto::SelectionStrategy;
use crate::remediation::policies::{DelegatedSelector, FixSelector, NearestVersionSelector};
use crate::shared::Result;

/// Connection settings for the delegated strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasoningOptions {
    pub api_base: String,
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
}

impl Default for ReasoningOptions {
    fn default() -> Self {
        Self {
            api_base: OpenAiReasoningClient::DEFAULT_API_BASE.to_string(),
            model: OpenAiReasoningClient::DEFAULT_MODEL.to_string(),
            api_key_env: OpenAiReasoningClient::DEFAULT_API_KEY_ENV.to_string(),
        }
    }
}

/// Factory for creating fix selectors
///
/// Callers receive a `Box<dyn FixSelector>` and never branch on the
/// strategy themselves.
pub struct FixSelectorFactory;

impl FixSelectorFactory {
    /// Creates the selector for `strategy`
    ///
    /// # Errors
    /// The delegated strategy fails when its API key is not available.
    pub fn create(
        strategy: SelectionStrategy,
        reasoning: &ReasoningOptions,
    ) -> Result<Box<dyn FixSelector>> {
        match strategy {
            SelectionStrategy::Nearest => Ok(Box::new(NearestVersionSelector::new())),
            SelectionStrategy::Delegated => {
                let client = OpenAiReasoningClient::from_env(
                    &reasoning.api_base,
                    &reasoning.model,
                    &reasoning.api_key_env,
                )?;
                Ok(Box::new(DelegatedSelector::new(client)))
            }
        }
    }

    /// Returns the progress message for the specified strategy
    pub fn progress_message(strategy: SelectionStrategy) -> &'static str {
        match strategy {
            SelectionStrategy::Nearest => "🎯 Selecting the nearest safe version for each package...",
            SelectionStrategy::Delegated => "🤖 Asking the reasoning model to choose a fix for each package...",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_nearest_selector() {
        let selector =
            FixSelectorFactory::create(SelectionStrategy::Nearest, &ReasoningOptions::default())
                .unwrap();
        assert_eq!(selector.name(), "nearest");
    }

    #[test]
    fn test_delegated_without_key_fails() {
        let options = ReasoningOptions {
            api_key_env: "AUTOHEAL_FACTORY_TEST_KEY_NEVER_SET".to_string(),
            ..ReasoningOptions::default()
        };
        let err = FixSelectorFactory::create(SelectionStrategy::Delegated, &options)
            .err()
            .unwrap();
        assert!(err.to_string().contains("AUTOHEAL_FACTORY_TEST_KEY_NEVER_SET"));
    }

    #[test]
    fn test_progress_message() {
        assert!(FixSelectorFactory::progress_message(SelectionStrategy::Nearest).starts_with("🎯"));
        assert!(FixSelectorFactory::progress_message(SelectionStrategy::Delegated).starts_with("🤖"));
    }
}
