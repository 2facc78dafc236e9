//! Project record, update payloads, and the expanded project view.
//!
//! The persisted [`ProjectRecord`] stores only links. [`ExpandedProjectView`]
//! is built fresh for each read with `expand` and never persisted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::CoreError;
use crate::principal::Principal;
use crate::roles::Role;
use crate::types::{Link, ProjectIndex};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Factory path under which every project lives.
pub const PROJECTS_LINK: &str = "/projects";

/// Document kind recorded on indexed project documents.
pub const PROJECT_KIND: &str = "project";

/// Custom property holding the external registry index.
pub const CUSTOM_PROPERTY_PROJECT_INDEX: &str = "__projectIndex";

/// Id of the well-known project every installation starts with.
pub const DEFAULT_PROJECT_ID: &str = "default-project";

/// External index of the default project in the registry.
pub const DEFAULT_PROJECT_INDEX: ProjectIndex = 1;

/// Maximum length of a project name.
pub const MAX_NAME_LENGTH: u64 = 255;

/// Maximum length of a project description.
pub const MAX_DESCRIPTION_LENGTH: u64 = 2000;

/// Payload keys that mark an update as a roles update.
pub const ROLE_UPDATE_KEYS: [&str; 3] = ["administrators", "members", "viewers"];

/// Link of the project with the given id.
pub fn project_link(id: &str) -> Link {
    format!("{PROJECTS_LINK}/{id}")
}

// ---------------------------------------------------------------------------
// ProjectRecord
// ---------------------------------------------------------------------------

/// A persisted project.
///
/// Role group links hold the groups whose principals take that role. The
/// role's default group, when provisioned, is listed at most once.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    #[validate(
        length(min = 1, max = MAX_NAME_LENGTH, message = "name must be 1-255 characters"),
        custom(function = "not_blank")
    )]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = MAX_DESCRIPTION_LENGTH, message = "description is too long"))]
    pub description: Option<String>,

    #[serde(default)]
    pub is_public: bool,

    #[serde(default)]
    pub administrator_group_links: Vec<Link>,

    #[serde(default)]
    pub member_group_links: Vec<Link>,

    #[serde(default)]
    pub viewer_group_links: Vec<Link>,

    #[serde(default)]
    pub custom_properties: BTreeMap<String, String>,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("name must not be blank".into());
        return Err(err);
    }
    Ok(())
}

impl ProjectRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// The well-known default project.
    pub fn default_project() -> Self {
        let mut project = Self::new(DEFAULT_PROJECT_ID, DEFAULT_PROJECT_ID);
        project.custom_properties.insert(
            CUSTOM_PROPERTY_PROJECT_INDEX.to_string(),
            DEFAULT_PROJECT_INDEX.to_string(),
        );
        project
    }

    pub fn self_link(&self) -> Link {
        project_link(&self.id)
    }

    /// Check required fields. Does not touch any collaborator.
    pub fn validate_fields(&self) -> Result<(), CoreError> {
        self.validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;
        self.parsed_project_index()?;
        Ok(())
    }

    pub fn group_links(&self, role: Role) -> &[Link] {
        match role {
            Role::Administrator => &self.administrator_group_links,
            Role::Member => &self.member_group_links,
            Role::Viewer => &self.viewer_group_links,
        }
    }

    pub fn group_links_mut(&mut self, role: Role) -> &mut Vec<Link> {
        match role {
            Role::Administrator => &mut self.administrator_group_links,
            Role::Member => &mut self.member_group_links,
            Role::Viewer => &mut self.viewer_group_links,
        }
    }

    /// True when at least one role has a group link.
    pub fn has_group_links(&self) -> bool {
        Role::ALL.iter().any(|r| !self.group_links(*r).is_empty())
    }

    /// Raw external index, if present and non-empty.
    pub fn project_index(&self) -> Option<&str> {
        self.custom_properties
            .get(CUSTOM_PROPERTY_PROJECT_INDEX)
            .map(String::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// External index parsed as an unsigned integer.
    pub fn parsed_project_index(&self) -> Result<Option<ProjectIndex>, CoreError> {
        match self.project_index() {
            None => Ok(None),
            Some(raw) => raw.trim().parse::<ProjectIndex>().map(Some).map_err(|_| {
                CoreError::Validation(format!(
                    "{CUSTOM_PROPERTY_PROJECT_INDEX} must be an unsigned integer, got '{raw}'"
                ))
            }),
        }
    }

    pub fn set_project_index(&mut self, index: ProjectIndex) {
        self.custom_properties
            .insert(CUSTOM_PROPERTY_PROJECT_INDEX.to_string(), index.to_string());
    }
}

// ---------------------------------------------------------------------------
// Update payloads
// ---------------------------------------------------------------------------

/// A partial update of the ordinary project fields.
///
/// Omitted fields are left untouched by the merge. Role group links are not
/// part of a patch; see [`ProjectRolesUpdate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_public: Option<bool>,
    #[serde(default)]
    pub custom_properties: Option<BTreeMap<String, String>>,
}

/// Wholesale replacement of one or more role group link lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectRolesUpdate {
    #[serde(default)]
    pub administrators: Option<Vec<Link>>,
    #[serde(default)]
    pub members: Option<Vec<Link>>,
    #[serde(default)]
    pub viewers: Option<Vec<Link>>,
}

impl ProjectRolesUpdate {
    pub fn links(&self, role: Role) -> Option<&[Link]> {
        match role {
            Role::Administrator => self.administrators.as_deref(),
            Role::Member => self.members.as_deref(),
            Role::Viewer => self.viewers.as_deref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        Role::ALL.iter().all(|r| self.links(*r).is_none())
    }
}

/// Either a generic field patch or a roles update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectUpdate {
    Patch(ProjectPatch),
    Roles(ProjectRolesUpdate),
}

impl ProjectUpdate {
    /// Classify a raw update body.
    ///
    /// A body carrying any of `administrators`, `members` or `viewers` is a
    /// roles update and must carry nothing else.
    pub fn from_value(body: serde_json::Value) -> Result<Self, CoreError> {
        let obj = body
            .as_object()
            .ok_or_else(|| CoreError::Validation("update body must be a JSON object".into()))?;

        let has_role_keys = obj.keys().any(|k| ROLE_UPDATE_KEYS.contains(&k.as_str()));
        if !has_role_keys {
            let patch = serde_json::from_value(body)
                .map_err(|e| CoreError::Validation(format!("invalid project patch: {e}")))?;
            return Ok(ProjectUpdate::Patch(patch));
        }

        if let Some(other) = obj.keys().find(|k| !ROLE_UPDATE_KEYS.contains(&k.as_str())) {
            return Err(CoreError::Validation(format!(
                "roles update cannot be combined with field '{other}'"
            )));
        }

        let roles = serde_json::from_value(body)
            .map_err(|e| CoreError::Validation(format!("invalid roles update: {e}")))?;
        Ok(ProjectUpdate::Roles(roles))
    }
}

// ---------------------------------------------------------------------------
// ExpandedProjectView
// ---------------------------------------------------------------------------

/// A project together with its resolved principals and related resources.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedProjectView {
    #[serde(flatten)]
    pub project: ProjectRecord,
    pub administrators: Vec<Principal>,
    pub members: Vec<Principal>,
    pub viewers: Vec<Principal>,
    pub cluster_links: Vec<Link>,
    pub template_links: Vec<Link>,
    pub repositories: Vec<String>,
    pub number_of_images: u64,
}

impl ExpandedProjectView {
    /// A view with no principals and no related resources.
    pub fn empty(project: ProjectRecord) -> Self {
        Self {
            project,
            administrators: Vec::new(),
            members: Vec::new(),
            viewers: Vec::new(),
            cluster_links: Vec::new(),
            template_links: Vec::new(),
            repositories: Vec::new(),
            number_of_images: 0,
        }
    }

    pub fn principals(&self, role: Role) -> &[Principal] {
        match role {
            Role::Administrator => &self.administrators,
            Role::Member => &self.members,
            Role::Viewer => &self.viewers,
        }
    }

    pub fn principals_mut(&mut self, role: Role) -> &mut Vec<Principal> {
        match role {
            Role::Administrator => &mut self.administrators,
            Role::Member => &mut self.members,
            Role::Viewer => &mut self.viewers,
        }
    }

    /// Record one registry repository and add its tags to the image count.
    ///
    /// Tag counts come from an external registry; the total saturates at
    /// `u64::MAX`.
    pub fn add_repository(&mut self, name: impl Into<String>, tags_count: u64) {
        self.repositories.push(name.into());
        self.number_of_images = self.number_of_images.saturating_add(tags_count);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
