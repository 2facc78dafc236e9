//! Engine error types.
//!
//! Required expansion branches surface their first failure with its cause
//! chain intact; the repository branch never produces an error.

use roster_core::error::CoreError;
use roster_core::types::Link;
use roster_db::RepoError;

/// Membership aggregation failed; no partial membership is returned.
#[derive(Debug, thiserror::Error)]
pub enum AggregationError {
    #[error("failed to list members of group {group}")]
    GroupMembers {
        group: Link,
        #[source]
        source: RepoError,
    },

    #[error("failed to resolve principal {id}")]
    Principal {
        id: String,
        #[source]
        source: RepoError,
    },
}

/// A required expansion branch failed.
#[derive(Debug, thiserror::Error)]
pub enum ExpansionError {
    #[error("membership aggregation failed")]
    Aggregation(#[from] AggregationError),

    #[error("cluster link lookup failed")]
    ClusterLinks(#[source] RepoError),

    #[error("template link lookup failed")]
    TemplateLinks(#[source] RepoError),
}

impl ExpansionError {
    /// The collaborator failure at the bottom of the chain.
    pub fn root_cause(&self) -> &RepoError {
        match self {
            ExpansionError::Aggregation(AggregationError::GroupMembers { source, .. })
            | ExpansionError::Aggregation(AggregationError::Principal { source, .. })
            | ExpansionError::ClusterLinks(source)
            | ExpansionError::TemplateLinks(source) => source,
        }
    }
}

/// Error returned by the service verbs.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Expansion(#[from] ExpansionError),

    #[error("Collaborator error: {0}")]
    Repository(#[from] RepoError),
}

impl From<AggregationError> for EngineError {
    fn from(err: AggregationError) -> Self {
        EngineError::Expansion(ExpansionError::Aggregation(err))
    }
}
