use std::time::Duration;

/// Failure reported by a collaborator.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RepoError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} {id} already exists")]
    AlreadyExists { entity: &'static str, id: String },

    /// A conditional write found the record changed since it was read.
    #[error("{entity} {id} was modified concurrently")]
    Stale { entity: &'static str, id: String },

    /// The collaborator could not be reached or answered with garbage.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}
