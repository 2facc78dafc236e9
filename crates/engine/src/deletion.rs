//! Deletion guard: a project referenced by placements cannot be deleted.

use std::sync::Arc;
use std::time::Duration;

use roster_core::error::CoreError;
use roster_core::query::{project_resources_query, PLACEMENT_KIND};
use roster_db::{DocumentIndex, RepoError};

use crate::error::EngineError;
use crate::timeout::bounded;

#[derive(Clone)]
pub struct DeletionGuard {
    documents: Arc<dyn DocumentIndex>,
    timeout: Duration,
}

impl DeletionGuard {
    pub fn new(documents: Arc<dyn DocumentIndex>, timeout: Duration) -> Self {
        Self { documents, timeout }
    }

    /// Number of placements associated with the project.
    pub async fn placement_count(&self, project_link: &str) -> Result<u64, RepoError> {
        let query = project_resources_query(PLACEMENT_KIND, project_link);
        bounded("count placements", self.timeout, self.documents.count(&query)).await
    }

    pub async fn can_delete(&self, project_link: &str) -> Result<bool, RepoError> {
        Ok(self.placement_count(project_link).await? == 0)
    }

    /// Fail with [`CoreError::InUse`] carrying the placement count when the
    /// project is still referenced.
    pub async fn ensure_deletable(&self, project_link: &str) -> Result<(), EngineError> {
        let count = self.placement_count(project_link).await?;
        if count > 0 {
            tracing::info!(project = %project_link, count, "Deletion refused, project in use");
            return Err(CoreError::InUse { count }.into());
        }
        Ok(())
    }
}
