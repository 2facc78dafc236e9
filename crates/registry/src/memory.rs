//! Fixed-content registry for development and tests.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::api::{RegistryError, RepositoryRegistry};

/// [`RepositoryRegistry`] answering from a fixed map of index -> raw body.
///
/// Unknown indexes answer like a proxy would for a missing project: 404.
#[derive(Debug, Default, Clone)]
pub struct MemoryRegistry {
    listings: HashMap<String, String>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the raw listing body served for `project_index`.
    pub fn with_listing(mut self, project_index: impl Into<String>, raw: impl Into<String>) -> Self {
        self.listings.insert(project_index.into(), raw.into());
        self
    }
}

#[async_trait]
impl RepositoryRegistry for MemoryRegistry {
    async fn fetch_repositories(&self, project_index: &str) -> Result<String, RegistryError> {
        self.listings
            .get(project_index)
            .cloned()
            .ok_or_else(|| RegistryError::Api {
                status: 404,
                body: format!("project {project_index} not found"),
            })
    }
}
