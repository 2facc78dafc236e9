#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use roster_core::principal::Principal;
use roster_core::project::ProjectRecord;
use roster_db::{
    DocumentIndex, GroupDirectory, MemoryDocumentIndex, MemoryGroupDirectory,
    MemoryPrincipalDirectory, MemoryProjectStore, PrincipalDirectory, ProjectStore, RepoError,
};
use roster_engine::{Caller, Collaborators, EngineConfig, ProjectService};
use roster_registry::{MemoryRegistry, RegistryError, RepositoryRegistry};

/// Timeout used by every engine built here.
pub const TEST_TIMEOUT: Duration = Duration::from_millis(200);

pub fn admin() -> Caller {
    Caller::new("admin-1", "admin")
}

pub fn user() -> Caller {
    Caller::new("user-1", "user")
}

pub fn test_config() -> EngineConfig {
    EngineConfig {
        collaborator_timeout: TEST_TIMEOUT,
    }
}

// ---------------------------------------------------------------------------
// Instrumented collaborators
// ---------------------------------------------------------------------------

/// Group directory that counts `list_members` calls.
#[derive(Default)]
pub struct CountingGroupDirectory {
    pub inner: MemoryGroupDirectory,
    pub list_calls: AtomicUsize,
}

impl CountingGroupDirectory {
    pub fn calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GroupDirectory for CountingGroupDirectory {
    async fn list_members(&self, group_link: &str) -> Result<Vec<String>, RepoError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.list_members(group_link).await
    }

    async fn create_group(&self, group_link: &str, members: &[String]) -> Result<(), RepoError> {
        self.inner.create_group(group_link, members).await
    }
}

/// Principal directory that counts lookups per call.
#[derive(Default)]
pub struct CountingPrincipalDirectory {
    pub inner: MemoryPrincipalDirectory,
    pub resolve_calls: AtomicUsize,
}

impl CountingPrincipalDirectory {
    pub fn calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PrincipalDirectory for CountingPrincipalDirectory {
    async fn resolve(&self, id: &str) -> Result<Principal, RepoError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.resolve(id).await
    }
}

/// Group directory whose every call fails with a transport error.
pub struct FailingGroupDirectory;

#[async_trait]
impl GroupDirectory for FailingGroupDirectory {
    async fn list_members(&self, _group_link: &str) -> Result<Vec<String>, RepoError> {
        Err(RepoError::Transport("group service unavailable".into()))
    }

    async fn create_group(&self, _group_link: &str, _members: &[String]) -> Result<(), RepoError> {
        Err(RepoError::Transport("group service unavailable".into()))
    }
}

/// Document index whose every call fails with a transport error.
pub struct FailingDocumentIndex;

#[async_trait]
impl DocumentIndex for FailingDocumentIndex {
    async fn count(&self, _query: &roster_core::query::Query) -> Result<u64, RepoError> {
        Err(RepoError::Transport("index unavailable".into()))
    }

    async fn links(&self, _query: &roster_core::query::Query) -> Result<Vec<String>, RepoError> {
        Err(RepoError::Transport("index unavailable".into()))
    }
}

/// Registry that never answers within [`TEST_TIMEOUT`].
pub struct SlowRegistry;

#[async_trait]
impl RepositoryRegistry for SlowRegistry {
    async fn fetch_repositories(&self, _project_index: &str) -> Result<String, RegistryError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok("[]".into())
    }
}

/// Project store that panics on any call; proves a verb fails before
/// reaching a collaborator.
pub struct UntouchableStore;

#[async_trait]
impl ProjectStore for UntouchableStore {
    async fn get(&self, id: &str) -> Result<Option<ProjectRecord>, RepoError> {
        panic!("unexpected get({id})")
    }

    async fn create(&self, project: &ProjectRecord) -> Result<ProjectRecord, RepoError> {
        panic!("unexpected create({})", project.id)
    }

    async fn put(&self, project: &ProjectRecord, _expected_signature: &str) -> Result<ProjectRecord, RepoError> {
        panic!("unexpected put({})", project.id)
    }

    async fn delete(&self, id: &str) -> Result<bool, RepoError> {
        panic!("unexpected delete({id})")
    }

    async fn find(&self, query: &roster_core::query::Query) -> Result<Vec<ProjectRecord>, RepoError> {
        panic!("unexpected find({query})")
    }
}

/// Project store that yields to the scheduler after every read, so
/// concurrent read-modify-write callers interleave.
pub struct InterleavingStore {
    pub inner: Arc<MemoryProjectStore>,
}

#[async_trait]
impl ProjectStore for InterleavingStore {
    async fn get(&self, id: &str) -> Result<Option<ProjectRecord>, RepoError> {
        let project = self.inner.get(id).await;
        tokio::task::yield_now().await;
        project
    }

    async fn create(&self, project: &ProjectRecord) -> Result<ProjectRecord, RepoError> {
        self.inner.create(project).await
    }

    async fn put(&self, project: &ProjectRecord, expected_signature: &str) -> Result<ProjectRecord, RepoError> {
        self.inner.put(project, expected_signature).await
    }

    async fn delete(&self, id: &str) -> Result<bool, RepoError> {
        self.inner.delete(id).await
    }

    async fn find(&self, query: &roster_core::query::Query) -> Result<Vec<ProjectRecord>, RepoError> {
        self.inner.find(query).await
    }
}

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

/// In-memory collaborators with handles kept for seeding and assertions.
pub struct Fixture {
    pub projects: Arc<MemoryProjectStore>,
    pub groups: Arc<CountingGroupDirectory>,
    pub principals: Arc<CountingPrincipalDirectory>,
    pub documents: Arc<MemoryDocumentIndex>,
    pub registry: Arc<dyn RepositoryRegistry>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_registry(Arc::new(MemoryRegistry::new()))
    }

    pub fn with_registry(registry: Arc<dyn RepositoryRegistry>) -> Self {
        Self {
            projects: Arc::new(MemoryProjectStore::new()),
            groups: Arc::new(CountingGroupDirectory::default()),
            principals: Arc::new(CountingPrincipalDirectory::default()),
            documents: Arc::new(MemoryDocumentIndex::new()),
            registry,
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            projects: self.projects.clone(),
            groups: self.groups.clone(),
            principals: self.principals.clone(),
            documents: self.documents.clone(),
            registry: Arc::clone(&self.registry),
        }
    }

    pub fn service(&self) -> ProjectService {
        ProjectService::new(self.collaborators(), test_config())
    }

    pub async fn user(&self, id: &str, name: &str) {
        self.principals.inner.insert(Principal::user(id, name)).await;
    }

    pub async fn group(&self, link: &str, name: &str, members: &[&str]) {
        self.groups.inner.insert_group(link, members).await;
        let id = roster_core::types::link_id(link);
        self.principals.inner.insert(Principal::group(id, name)).await;
    }

    pub async fn store(&self, project: &ProjectRecord) {
        self.projects
            .create(project)
            .await
            .expect("seed project should be stored");
    }
}
