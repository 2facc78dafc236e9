//! Identity lookup port.

use std::collections::HashMap;

use async_trait::async_trait;
use roster_core::principal::Principal;
use tokio::sync::RwLock;

use crate::error::RepoError;

/// Resolves user and group ids to canonical principals.
#[async_trait]
pub trait PrincipalDirectory: Send + Sync {
    async fn resolve(&self, id: &str) -> Result<Principal, RepoError>;
}

/// Process-local [`PrincipalDirectory`].
#[derive(Default)]
pub struct MemoryPrincipalDirectory {
    principals: RwLock<HashMap<String, Principal>>,
}

impl MemoryPrincipalDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, principal: Principal) {
        self.principals
            .write()
            .await
            .insert(principal.id.clone(), principal);
    }
}

#[async_trait]
impl PrincipalDirectory for MemoryPrincipalDirectory {
    async fn resolve(&self, id: &str) -> Result<Principal, RepoError> {
        self.principals
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| RepoError::NotFound {
                entity: "Principal",
                id: id.to_string(),
            })
    }
}
