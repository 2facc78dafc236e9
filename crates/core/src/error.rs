#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Project is associated with {count} placement{}", plural_suffix(.count))]
    InUse { count: u64 },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),
}

fn plural_suffix(count: &u64) -> &'static str {
    if *count == 1 {
        ""
    } else {
        "s"
    }
}
