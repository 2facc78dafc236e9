//! Principal resolution.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use roster_core::principal::Principal;
use roster_db::{PrincipalDirectory, RepoError};

use crate::error::AggregationError;
use crate::timeout::bounded;

/// Resolves raw user / group ids to canonical principals.
///
/// Callers de-duplicate ids before calling [`resolve_all`](Self::resolve_all);
/// each id passed in is looked up exactly once.
#[derive(Clone)]
pub struct PrincipalResolver {
    directory: Arc<dyn PrincipalDirectory>,
    timeout: Duration,
}

impl PrincipalResolver {
    pub fn new(directory: Arc<dyn PrincipalDirectory>, timeout: Duration) -> Self {
        Self { directory, timeout }
    }

    /// Resolve one id.
    pub async fn resolve(&self, id: &str) -> Result<Principal, RepoError> {
        bounded("resolve principal", self.timeout, self.directory.resolve(id)).await
    }

    /// Resolve every id concurrently into an id -> principal map.
    ///
    /// Fails fast on the first lookup that fails.
    pub async fn resolve_all<'a, I>(&self, ids: I) -> Result<HashMap<String, Principal>, AggregationError>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let lookups = ids.into_iter().map(|id| async move {
            self.resolve(id)
                .await
                .map(|principal| (id.clone(), principal))
                .map_err(|source| AggregationError::Principal {
                    id: id.clone(),
                    source,
                })
        });
        Ok(try_join_all(lookups).await?.into_iter().collect())
    }
}
