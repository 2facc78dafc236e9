//! Patch merge and roles replacement.
//!
//! Both operations work on an in-memory copy of the current record and
//! report whether the result differs from it by comparing signatures before
//! and after. Nothing here writes anywhere; the caller decides whether to
//! persist based on [`MergeOutcome::changed`].

use std::collections::BTreeMap;

use indexmap::IndexSet;

use crate::error::CoreError;
use crate::project::{ProjectPatch, ProjectRecord, ProjectRolesUpdate, CUSTOM_PROPERTY_PROJECT_INDEX};
use crate::roles::Role;
use crate::signature::compute_signature;
use crate::types::Link;

/// Result of merging an update onto a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub merged: ProjectRecord,
    pub changed: bool,
}

/// Additive merge of custom properties.
///
/// Keys only in `current` are kept, keys only in `patch` are added, and
/// `patch` wins where both have a key. An assigned project index is never
/// replaced.
pub fn merge_custom_properties(
    current: &BTreeMap<String, String>,
    patch: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let index_assigned = current
        .get(CUSTOM_PROPERTY_PROJECT_INDEX)
        .is_some_and(|v| !v.trim().is_empty());

    let mut merged = current.clone();
    for (key, value) in patch {
        if index_assigned && key == CUSTOM_PROPERTY_PROJECT_INDEX {
            continue;
        }
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Merge a field patch onto `current`.
///
/// A field is overwritten only when the patch supplies it. Role group links
/// are never touched here.
pub fn merge_patch(current: &ProjectRecord, patch: &ProjectPatch) -> MergeOutcome {
    let before = compute_signature(current);
    let mut merged = current.clone();

    if let Some(name) = &patch.name {
        merged.name = name.clone();
    }
    if let Some(description) = &patch.description {
        merged.description = Some(description.clone());
    }
    if let Some(is_public) = patch.is_public {
        merged.is_public = is_public;
    }
    if let Some(properties) = &patch.custom_properties {
        merged.custom_properties = merge_custom_properties(&current.custom_properties, properties);
    }

    let changed = compute_signature(&merged) != before;
    MergeOutcome { merged, changed }
}

/// Replace the role group link lists named in `update`.
///
/// Each supplied list is trimmed and de-duplicated in input order; an empty
/// link is rejected. Roles the update omits keep their current links.
pub fn apply_roles_update(
    current: &ProjectRecord,
    update: &ProjectRolesUpdate,
) -> Result<MergeOutcome, CoreError> {
    if update.is_empty() {
        return Err(CoreError::Validation(
            "roles update must name at least one role".to_string(),
        ));
    }

    let before = compute_signature(current);
    let mut merged = current.clone();

    for role in Role::ALL {
        if let Some(links) = update.links(role) {
            *merged.group_links_mut(role) = normalize_group_links(role, links)?;
        }
    }

    let changed = compute_signature(&merged) != before;
    Ok(MergeOutcome { merged, changed })
}

/// Normalize the group links of every role in place.
pub fn normalize_project_links(project: &mut ProjectRecord) -> Result<(), CoreError> {
    for role in Role::ALL {
        let normalized = normalize_group_links(role, project.group_links(role))?;
        *project.group_links_mut(role) = normalized;
    }
    Ok(())
}

/// Trim, reject empty entries and drop duplicates while keeping first-seen order.
pub fn normalize_group_links(role: Role, links: &[Link]) -> Result<Vec<Link>, CoreError> {
    let mut unique: IndexSet<Link> = IndexSet::with_capacity(links.len());
    for link in links {
        let trimmed = link.trim();
        if trimmed.is_empty() {
            return Err(CoreError::Validation(format!(
                "{role} group links must not contain empty entries"
            )));
        }
        unique.insert(trimmed.to_string());
    }
    Ok(unique.into_iter().collect())
}
