//! User group membership port.

use std::collections::HashMap;

use async_trait::async_trait;
use roster_core::types::Link;
use tokio::sync::RwLock;

use crate::error::RepoError;

/// Lists and provisions user groups.
#[async_trait]
pub trait GroupDirectory: Send + Sync {
    /// Ids of the users in the group at `group_link`, in directory order.
    async fn list_members(&self, group_link: &str) -> Result<Vec<String>, RepoError>;

    /// Create a group with the given initial members.
    ///
    /// Fails with `AlreadyExists` if a group already lives at `group_link`.
    async fn create_group(&self, group_link: &str, members: &[String]) -> Result<(), RepoError>;
}

/// Process-local [`GroupDirectory`].
#[derive(Default)]
pub struct MemoryGroupDirectory {
    groups: RwLock<HashMap<Link, Vec<String>>>,
}

impl MemoryGroupDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a group, replacing any existing membership.
    pub async fn insert_group(&self, group_link: impl Into<Link>, members: &[&str]) {
        self.groups.write().await.insert(
            group_link.into(),
            members.iter().map(|m| m.to_string()).collect(),
        );
    }

    pub async fn contains(&self, group_link: &str) -> bool {
        self.groups.read().await.contains_key(group_link)
    }
}

#[async_trait]
impl GroupDirectory for MemoryGroupDirectory {
    async fn list_members(&self, group_link: &str) -> Result<Vec<String>, RepoError> {
        self.groups
            .read()
            .await
            .get(group_link)
            .cloned()
            .ok_or_else(|| RepoError::NotFound {
                entity: "UserGroup",
                id: group_link.to_string(),
            })
    }

    async fn create_group(&self, group_link: &str, members: &[String]) -> Result<(), RepoError> {
        let mut groups = self.groups.write().await;
        if groups.contains_key(group_link) {
            return Err(RepoError::AlreadyExists {
                entity: "UserGroup",
                id: group_link.to_string(),
            });
        }
        groups.insert(group_link.to_string(), members.to_vec());
        Ok(())
    }
}
