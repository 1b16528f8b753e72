use serde::Serialize;

/// Pipeline stage an isolated failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Manifest,
    Graph,
    Scan,
    Selection,
    Patch,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Manifest => "manifest",
            Stage::Graph => "graph",
            Stage::Scan => "scan",
            Stage::Selection => "selection",
            Stage::Patch => "patch",
        };
        write!(f, "{}", name)
    }
}

/// A skipped or failed item, kept so the summary never drops it silently
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub stage: Stage,
    /// Package identity or manifest line the issue is about
    pub subject: String,
    pub error: String,
}

impl Issue {
    pub fn new(stage: Stage, subject: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            stage,
            subject: subject.into(),
            error: error.into(),
        }
    }
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.stage, self.subject, self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_display() {
        let issue = Issue::new(Stage::Graph, "flask==2.0.0", "no release satisfies '>=99'");
        assert_eq!(
            issue.to_string(),
            "[graph] flask==2.0.0: no release satisfies '>=99'"
        );
    }
}
