use serde::Deserialize;

/// Fix selection strategy
///
/// Shared by the CLI, the config file and the selector factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionStrategy {
    /// Closest candidate by weighted release distance (default)
    #[default]
    Nearest,
    /// Ask the reasoning collaborator
    Delegated,
}

impl std::str::FromStr for SelectionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nearest" => Ok(SelectionStrategy::Nearest),
            "delegated" | "llm" => Ok(SelectionStrategy::Delegated),
            _ => Err(format!(
                "Invalid strategy: {}. Please specify 'nearest' or 'delegated'",
                s
            )),
        }
    }
}

impl std::fmt::Display for SelectionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionStrategy::Nearest => write!(f, "nearest"),
            SelectionStrategy::Delegated => write!(f, "delegated"),
        }
    }
}
