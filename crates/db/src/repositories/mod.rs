//! Collaborator ports and their in-memory implementations.

pub mod document_repo;
pub mod group_repo;
pub mod principal_repo;
pub mod project_repo;

pub use document_repo::{DocumentIndex, MemoryDocumentIndex};
pub use group_repo::{GroupDirectory, MemoryGroupDirectory};
pub use principal_repo::{MemoryPrincipalDirectory, PrincipalDirectory};
pub use project_repo::{MemoryProjectStore, ProjectStore};
