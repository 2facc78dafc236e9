//! Auxiliary resource lookups for a project: clusters, templates and
//! registry repositories.

use std::sync::Arc;
use std::time::Duration;

use roster_core::query::{project_resources_query, CLUSTER_KIND, TEMPLATE_KIND};
use roster_core::types::Link;
use roster_db::{DocumentIndex, RepoError};
use roster_registry::{parse_repositories, RepositoryEntry, RepositoryRegistry};

use crate::timeout::bounded;

#[derive(Clone)]
pub struct AuxiliaryLinker {
    documents: Arc<dyn DocumentIndex>,
    registry: Arc<dyn RepositoryRegistry>,
    timeout: Duration,
}

impl AuxiliaryLinker {
    pub fn new(
        documents: Arc<dyn DocumentIndex>,
        registry: Arc<dyn RepositoryRegistry>,
        timeout: Duration,
    ) -> Self {
        Self {
            documents,
            registry,
            timeout,
        }
    }

    /// Links of the clusters associated with the project.
    pub async fn cluster_links(&self, project_link: &str) -> Result<Vec<Link>, RepoError> {
        let query = project_resources_query(CLUSTER_KIND, project_link);
        bounded("list cluster links", self.timeout, self.documents.links(&query)).await
    }

    /// Links of the templates associated with the project.
    pub async fn template_links(&self, project_link: &str) -> Result<Vec<Link>, RepoError> {
        let query = project_resources_query(TEMPLATE_KIND, project_link);
        bounded("list template links", self.timeout, self.documents.links(&query)).await
    }

    /// Repositories and tag counts from the external registry.
    ///
    /// Never fails: a missing index, a registry failure, a timeout or an
    /// undecodable listing all yield an empty list and a warning.
    pub async fn repositories(
        &self,
        project_link: &str,
        project_index: Option<&str>,
    ) -> Vec<RepositoryEntry> {
        let Some(index) = project_index.map(str::trim).filter(|i| !i.is_empty()) else {
            tracing::warn!(project = %project_link, "No registry project index, skipping repository lookup");
            return Vec::new();
        };

        let raw = match tokio::time::timeout(self.timeout, self.registry.fetch_repositories(index)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                tracing::warn!(project = %project_link, index, error = %e, "Unable to retrieve repositories");
                return Vec::new();
            }
            Err(_) => {
                tracing::warn!(project = %project_link, index, after = ?self.timeout, "Repository lookup timed out");
                return Vec::new();
            }
        };

        match parse_repositories(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(project = %project_link, index, error = %e, "Unable to parse repository listing");
                Vec::new()
            }
        }
    }
}
