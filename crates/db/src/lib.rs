//! Collaborator ports consumed by the project engine.
//!
//! Each port is an `async_trait` so the engine can hold it as
//! `Arc<dyn Port>`. The in-memory implementations back the API binary's
//! development mode and every test in the workspace.

pub mod error;
pub mod repositories;

pub use error::RepoError;
pub use repositories::{
    DocumentIndex, GroupDirectory, MemoryDocumentIndex, MemoryGroupDirectory,
    MemoryPrincipalDirectory, MemoryProjectStore, PrincipalDirectory, ProjectStore,
};
