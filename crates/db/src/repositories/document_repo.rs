//! Index over documents that reference projects (clusters, templates,
//! placements).

use async_trait::async_trait;
use roster_core::query::{Query, FIELD_KIND, FIELD_SELF_LINK, FIELD_TENANT_LINKS};
use roster_core::types::Link;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::error::RepoError;

/// Predicate queries over indexed documents.
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    /// Number of documents matching `query`.
    async fn count(&self, query: &Query) -> Result<u64, RepoError>;

    /// Self links of the documents matching `query`, in index order.
    async fn links(&self, query: &Query) -> Result<Vec<Link>, RepoError>;
}

/// Process-local [`DocumentIndex`] holding raw JSON documents.
#[derive(Default)]
pub struct MemoryDocumentIndex {
    documents: RwLock<Vec<Value>>,
}

impl MemoryDocumentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a document of `kind` at `self_link` owned by `tenant_links`.
    pub async fn insert(&self, kind: &str, self_link: impl Into<Link>, tenant_links: &[&str]) {
        self.documents.write().await.push(json!({
            FIELD_KIND: kind,
            FIELD_SELF_LINK: self_link.into(),
            FIELD_TENANT_LINKS: tenant_links,
        }));
    }
}

#[async_trait]
impl DocumentIndex for MemoryDocumentIndex {
    async fn count(&self, query: &Query) -> Result<u64, RepoError> {
        let documents = self.documents.read().await;
        Ok(documents.iter().filter(|d| query.matches(d)).count() as u64)
    }

    async fn links(&self, query: &Query) -> Result<Vec<Link>, RepoError> {
        let documents = self.documents.read().await;
        Ok(documents
            .iter()
            .filter(|d| query.matches(d))
            .filter_map(|d| d.get(FIELD_SELF_LINK).and_then(Value::as_str))
            .map(str::to_string)
            .collect())
    }
}
