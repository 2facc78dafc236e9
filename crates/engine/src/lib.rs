//! Project membership and state expansion engine.
//!
//! - [`expansion::ProjectExpander`] hydrates a stored project into an
//!   [`ExpandedProjectView`](roster_core::project::ExpandedProjectView) by
//!   running membership aggregation and the auxiliary lookups concurrently.
//! - [`service::ProjectService`] exposes the create / read / replace /
//!   update / delete verbs, including the patch merge, the privileged roles
//!   update and the deletion guard.
//! - [`events::ProjectEventBus`] broadcasts state changes; not-modified
//!   updates publish nothing.

pub mod access;
pub mod config;
pub mod deletion;
pub mod error;
pub mod events;
pub mod expansion;
pub mod linker;
pub mod membership;
pub mod principal;
pub mod service;
pub mod timeout;

use std::sync::Arc;

use roster_db::{DocumentIndex, GroupDirectory, PrincipalDirectory, ProjectStore};
use roster_registry::RepositoryRegistry;

pub use access::{AccessPolicy, Caller, RoleAccessPolicy};
pub use config::EngineConfig;
pub use error::{AggregationError, EngineError, ExpansionError};
pub use events::{log_project_events, ProjectEvent, ProjectEventBus};
pub use expansion::ProjectExpander;
pub use service::{ProjectRead, ProjectService, UpdateOutcome};

/// Handles to every collaborator the engine consumes.
#[derive(Clone)]
pub struct Collaborators {
    pub projects: Arc<dyn ProjectStore>,
    pub groups: Arc<dyn GroupDirectory>,
    pub principals: Arc<dyn PrincipalDirectory>,
    pub documents: Arc<dyn DocumentIndex>,
    pub registry: Arc<dyn RepositoryRegistry>,
}
