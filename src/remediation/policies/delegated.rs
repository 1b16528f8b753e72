use super::fix_selector::{FixRequest, FixSelector};
use crate::ports::outbound::{ReasoningClient, ReasoningRequest};
use crate::remediation::domain::{FixDecision, FixSelection, PackageVersion};
use crate::shared::Result;
use async_trait::async_trait;
use tracing::warn;

/// Delegated policy: an external reasoning collaborator picks the version.
///
/// Its answer is taken verbatim as long as it parses and is newer than the
/// current version. Packages without an eligible candidate never reach the
/// collaborator.
pub struct DelegatedSelector<C: ReasoningClient> {
    client: C,
}

impl<C: ReasoningClient> DelegatedSelector<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C: ReasoningClient> FixSelector for DelegatedSelector<C> {
    fn name(&self) -> &'static str {
        "delegated"
    }

    async fn select(&self, request: &FixRequest) -> Result<FixDecision> {
        let eligible = request.eligible();
        if eligible.is_empty() {
            return Ok(request.no_fix());
        }

        let reasoning_request = ReasoningRequest {
            package: request.package.to_string(),
            current_version: request.current.to_string(),
            candidates: eligible.iter().map(|v| v.to_string()).collect(),
            max_severity: request.max_severity,
            advisories: request.advisories.clone(),
        };
        let response = self.client.choose_fix(&reasoning_request).await?;

        let Some(chosen) = PackageVersion::try_parse(&response.chosen_version) else {
            return Ok(FixDecision::NoAcceptableFix {
                reason: format!(
                    "reasoning collaborator chose '{}', which is not a valid version",
                    response.chosen_version
                ),
            });
        };

        if chosen <= request.current {
            return Ok(FixDecision::NoAcceptableFix {
                reason: format!(
                    "reasoning collaborator chose {}, which does not exceed the current version {}",
                    chosen, request.current
                ),
            });
        }

        if !eligible.contains(&&chosen) {
            warn!(
                package = %request.package,
                chosen = %chosen,
                "Delegated choice is not among the computed candidates"
            );
        }

        Ok(FixDecision::Selected(FixSelection::new(
            request.package.clone(),
            request.current.clone(),
            chosen,
            response.rationale,
        )))
    }
}
