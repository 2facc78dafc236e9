//! Project state expansion.

use std::sync::Arc;

use roster_core::project::{ExpandedProjectView, ProjectRecord};

use crate::config::EngineConfig;
use crate::error::ExpansionError;
use crate::linker::AuxiliaryLinker;
use crate::membership::{MembershipAggregator, RoleMembership};
use crate::principal::PrincipalResolver;
use crate::Collaborators;

/// Hydrates a stored project into an [`ExpandedProjectView`].
///
/// Membership aggregation and the cluster, template and repository lookups
/// run concurrently. The first failing required branch fails the expansion;
/// the repository branch degrades to an empty listing instead.
#[derive(Clone)]
pub struct ProjectExpander {
    membership: MembershipAggregator,
    linker: AuxiliaryLinker,
}

impl ProjectExpander {
    pub fn new(collaborators: &Collaborators, config: &EngineConfig) -> Self {
        let timeout = config.collaborator_timeout;
        let resolver = PrincipalResolver::new(Arc::clone(&collaborators.principals), timeout);
        Self {
            membership: MembershipAggregator::new(Arc::clone(&collaborators.groups), resolver, timeout),
            linker: AuxiliaryLinker::new(
                Arc::clone(&collaborators.documents),
                Arc::clone(&collaborators.registry),
                timeout,
            ),
        }
    }

    pub async fn expand(&self, project: ProjectRecord) -> Result<ExpandedProjectView, ExpansionError> {
        let project_link = project.self_link();

        let membership = async {
            if !project.has_group_links() {
                tracing::debug!(project = %project_link, "Project has no group links");
                return Ok(RoleMembership::default());
            }
            self.membership
                .aggregate(&project)
                .await
                .map_err(ExpansionError::from)
        };
        let clusters = async {
            self.linker
                .cluster_links(&project_link)
                .await
                .map_err(ExpansionError::ClusterLinks)
        };
        let templates = async {
            self.linker
                .template_links(&project_link)
                .await
                .map_err(ExpansionError::TemplateLinks)
        };
        let repositories = async {
            Ok::<_, ExpansionError>(
                self.linker
                    .repositories(&project_link, project.project_index())
                    .await,
            )
        };

        let result = tokio::try_join!(membership, clusters, templates, repositories);
        let (membership, cluster_links, template_links, repositories) = match result {
            Ok(branches) => branches,
            Err(e) => {
                tracing::warn!(project = %project_link, error = %e, cause = %e.root_cause(), "Project expansion failed");
                return Err(e);
            }
        };

        let mut view = ExpandedProjectView::empty(project);
        view.administrators = membership.administrators;
        view.members = membership.members;
        view.viewers = membership.viewers;
        view.cluster_links = cluster_links;
        view.template_links = template_links;
        for entry in repositories {
            view.add_repository(entry.name, entry.tags_count);
        }
        Ok(view)
    }
}
