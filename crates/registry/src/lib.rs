//! External image registry proxy client.
//!
//! The registry answers a repository listing for one of its projects with a
//! bare JSON array. [`RepositoryRegistry`] fetches that raw text and
//! [`parse_repositories`] decodes it into [`RepositoryEntry`] values.

pub mod api;
pub mod memory;
pub mod response;

pub use api::{RegistryError, RegistryProxyClient, RepositoryRegistry};
pub use memory::MemoryRegistry;
pub use response::{parse_repositories, RepositoryEntry};
