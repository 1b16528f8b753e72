use crate::ports::outbound::{
    DeclaredRequirement, DependencyMetadataSource, ProgressReporter, ReleaseRegistry,
};
use crate::remediation::domain::{DependencyGraph, Issue, PackageId, RequirementRecord, Stage};
use crate::remediation::services::VersionResolver;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, warn};

/// Output of the graph stage
#[derive(Debug, Clone, Default)]
pub struct GraphBuild {
    pub graph: DependencyGraph,
    /// Nodes whose metadata could not be fetched and edges that could not
    /// be resolved
    pub issues: Vec<Issue>,
}

/// BuildDependencyGraphUseCase - expands direct requirements into the full
/// transitive graph.
///
/// Iterates an explicit frontier with a visited set, so every identity's
/// dependencies are fetched at most once and cycles terminate. Failures are
/// isolated to the node or edge they concern.
///
/// # Type Parameters
/// * `S` - DependencyMetadataSource implementation
/// * `R` - ReleaseRegistry used to resolve constraint-only dependencies
/// * `PR` - ProgressReporter implementation
pub struct BuildDependencyGraphUseCase<'a, S, R, PR>
where
    S: DependencyMetadataSource,
    R: ReleaseRegistry,
    PR: ProgressReporter,
{
    source: &'a S,
    resolver: &'a VersionResolver<R>,
    progress_reporter: &'a PR,
}

impl<'a, S, R, PR> BuildDependencyGraphUseCase<'a, S, R, PR>
where
    S: DependencyMetadataSource,
    R: ReleaseRegistry,
    PR: ProgressReporter,
{
    pub fn new(source: &'a S, resolver: &'a VersionResolver<R>, progress_reporter: &'a PR) -> Self {
        Self {
            source,
            resolver,
            progress_reporter,
        }
    }

    /// Builds the graph rooted at `requirements` (depth 1, direct).
    pub async fn execute(&self, requirements: &[RequirementRecord]) -> GraphBuild {
        let mut build = GraphBuild::default();
        let mut frontier: VecDeque<(PackageId, u32)> = VecDeque::new();
        let mut visited: HashSet<PackageId> = HashSet::new();

        for requirement in requirements {
            let id = PackageId::new(requirement.name().clone(), requirement.version().clone());
            if build.graph.add_node(id.clone(), true, 1) {
                frontier.push_back((id, 1));
            }
        }

        while let Some((id, depth)) = frontier.pop_front() {
            if !visited.insert(id.clone()) {
                continue;
            }
            self.progress_reporter.report_progress(
                visited.len(),
                visited.len() + frontier.len(),
                Some(&id.to_string()),
            );

            let declared = match self.source.declared_dependencies(&id).await {
                Ok(declared) => declared,
                Err(e) => {
                    warn!(package = %id, error = %e, "Failed to fetch dependency metadata");
                    build
                        .issues
                        .push(Issue::new(Stage::Graph, id.to_string(), format!("{:#}", e)));
                    continue;
                }
            };
            debug!(package = %id, count = declared.len(), "Fetched declared dependencies");

            for dependency in declared {
                let version = match dependency.requirement {
                    DeclaredRequirement::Exact(version) => version,
                    DeclaredRequirement::Constraint(constraint) => {
                        match self.resolver.resolve(&dependency.name, &constraint).await {
                            Ok(version) => version,
                            Err(e) => {
                                warn!(
                                    parent = %id,
                                    dependency = %dependency.name,
                                    constraint = %constraint,
                                    error = %e,
                                    "Skipping unresolvable dependency edge"
                                );
                                build.issues.push(Issue::new(
                                    Stage::Graph,
                                    format!("{} -> {} {}", id, dependency.name, constraint),
                                    format!("{:#}", e),
                                ));
                                continue;
                            }
                        }
                    }
                };

                let child = PackageId::new(dependency.name, version);
                build.graph.add_node(child.clone(), false, depth + 1);
                build.graph.add_edge(&id, &child);
                if !visited.contains(&child) {
                    frontier.push_back((child, depth + 1));
                }
            }
        }

        build
    }
}
