//! Persistence port for project records.

use std::collections::BTreeMap;

use async_trait::async_trait;
use roster_core::project::ProjectRecord;
use roster_core::query::{project_document, Query};
use roster_core::signature::compute_signature;
use tokio::sync::RwLock;

use crate::error::RepoError;

/// Keyed storage for project records plus predicate lookup.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Fetch a project by id.
    async fn get(&self, id: &str) -> Result<Option<ProjectRecord>, RepoError>;

    /// Insert a new project. Fails with `AlreadyExists` if the id is taken.
    async fn create(&self, project: &ProjectRecord) -> Result<ProjectRecord, RepoError>;

    /// Overwrite an existing project if its stored signature still equals
    /// `expected_signature`.
    ///
    /// Fails with `NotFound` if it is absent and with `Stale` if another
    /// write landed since the caller read it.
    async fn put(&self, project: &ProjectRecord, expected_signature: &str) -> Result<ProjectRecord, RepoError>;

    /// Remove a project. Returns `true` if a record was removed.
    async fn delete(&self, id: &str) -> Result<bool, RepoError>;

    /// Every project whose indexed document matches `query`.
    async fn find(&self, query: &Query) -> Result<Vec<ProjectRecord>, RepoError>;
}

/// Process-local [`ProjectStore`] ordered by project id.
#[derive(Default)]
pub struct MemoryProjectStore {
    projects: RwLock<BTreeMap<String, ProjectRecord>>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.projects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.projects.read().await.is_empty()
    }
}

#[async_trait]
impl ProjectStore for MemoryProjectStore {
    async fn get(&self, id: &str) -> Result<Option<ProjectRecord>, RepoError> {
        Ok(self.projects.read().await.get(id).cloned())
    }

    async fn create(&self, project: &ProjectRecord) -> Result<ProjectRecord, RepoError> {
        let mut projects = self.projects.write().await;
        if projects.contains_key(&project.id) {
            return Err(RepoError::AlreadyExists {
                entity: "Project",
                id: project.id.clone(),
            });
        }
        projects.insert(project.id.clone(), project.clone());
        tracing::debug!(project_id = %project.id, "Project stored");
        Ok(project.clone())
    }

    async fn put(&self, project: &ProjectRecord, expected_signature: &str) -> Result<ProjectRecord, RepoError> {
        let mut projects = self.projects.write().await;
        match projects.get_mut(&project.id) {
            Some(slot) if compute_signature(slot) != expected_signature => {
                tracing::debug!(project_id = %project.id, "Rejected stale project write");
                Err(RepoError::Stale {
                    entity: "Project",
                    id: project.id.clone(),
                })
            }
            Some(slot) => {
                *slot = project.clone();
                Ok(project.clone())
            }
            None => Err(RepoError::NotFound {
                entity: "Project",
                id: project.id.clone(),
            }),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, RepoError> {
        Ok(self.projects.write().await.remove(id).is_some())
    }

    async fn find(&self, query: &Query) -> Result<Vec<ProjectRecord>, RepoError> {
        Ok(self
            .projects
            .read()
            .await
            .values()
            .filter(|p| query.matches(&project_document(p)))
            .cloned()
            .collect())
    }
}
