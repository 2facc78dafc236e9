//! Caller roles and project roles.
//!
//! Caller role names must match the `role` claim issued in access tokens.
//! Project roles scope what a principal may do inside one project; each has a
//! default user group whose address is derived from the project id.

use serde::{Deserialize, Serialize};

use crate::types::Link;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

/// Factory path under which every user group lives.
pub const USER_GROUPS_LINK: &str = "/core/authz/user-groups";

/// A role a principal can hold inside a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Administrator,
    Member,
    Viewer,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Administrator, Role::Member, Role::Viewer];

    /// Suffix appended to the project id to name the role's default group.
    pub fn group_suffix(self) -> &'static str {
        match self {
            Role::Administrator => "project-admins",
            Role::Member => "project-members",
            Role::Viewer => "project-viewers",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Administrator => "administrator",
            Role::Member => "member",
            Role::Viewer => "viewer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Id of the default group for `role` in the project `project_id`.
pub fn default_group_id(role: Role, project_id: &str) -> String {
    format!("{project_id}_{}", role.group_suffix())
}

/// Address of the default group for `role` in the project `project_id`.
///
/// Total and pure: the same inputs always yield the same address, and
/// distinct roles never collide for the same project.
pub fn default_group_link(role: Role, project_id: &str) -> Link {
    format!("{USER_GROUPS_LINK}/{}", default_group_id(role, project_id))
}
