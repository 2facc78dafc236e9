//! External project index generation.
//!
//! Indexes correlate a project with a project in the external image
//! registry, which stores them as unsigned 32-bit integers. `0` and `1` are
//! reserved (`1` belongs to the default project).

use rand::Rng;

use crate::types::ProjectIndex;

/// Smallest index handed out to new projects.
pub const PROJECT_INDEX_ORIGIN: ProjectIndex = 2;

/// Exclusive upper bound; simulates the unsigned 32-bit range.
pub const PROJECT_INDEX_BOUND: ProjectIndex = (i32::MAX as ProjectIndex) * 2;

/// Draw a random index in `[PROJECT_INDEX_ORIGIN, PROJECT_INDEX_BOUND)`.
pub fn generate_project_index() -> ProjectIndex {
    rand::rng().random_range(PROJECT_INDEX_ORIGIN..PROJECT_INDEX_BOUND)
}
