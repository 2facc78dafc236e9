//! Role membership aggregation.
//!
//! A role's principals come from two sources:
//!
//! 1. the users in the role's default group, and
//! 2. every extra group linked on the project for that role, added as a
//!    group principal (the group itself, not its members).
//!
//! The final list is the default-group users in directory order followed by
//! the extra groups in link order. Duplicates across the two sources are
//! kept because user and group principals are distinct kinds.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use indexmap::IndexSet;
use roster_core::principal::Principal;
use roster_core::project::ProjectRecord;
use roster_core::roles::{default_group_link, Role};
use roster_core::types::{link_id, Link};
use roster_db::{GroupDirectory, RepoError};

use crate::error::AggregationError;
use crate::principal::PrincipalResolver;
use crate::timeout::bounded;

/// Principals per role for one project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleMembership {
    pub administrators: Vec<Principal>,
    pub members: Vec<Principal>,
    pub viewers: Vec<Principal>,
}

impl RoleMembership {
    pub fn get(&self, role: Role) -> &[Principal] {
        match role {
            Role::Administrator => &self.administrators,
            Role::Member => &self.members,
            Role::Viewer => &self.viewers,
        }
    }

    fn get_mut(&mut self, role: Role) -> &mut Vec<Principal> {
        match role {
            Role::Administrator => &mut self.administrators,
            Role::Member => &mut self.members,
            Role::Viewer => &mut self.viewers,
        }
    }
}

/// Fans out the group membership lookups for a project.
#[derive(Clone)]
pub struct MembershipAggregator {
    groups: Arc<dyn GroupDirectory>,
    resolver: PrincipalResolver,
    timeout: Duration,
}

impl MembershipAggregator {
    pub fn new(groups: Arc<dyn GroupDirectory>, resolver: PrincipalResolver, timeout: Duration) -> Self {
        Self {
            groups,
            resolver,
            timeout,
        }
    }

    /// Build the per-role principal lists for `project`.
    pub async fn aggregate(&self, project: &ProjectRecord) -> Result<RoleMembership, AggregationError> {
        let (mut membership, admin_groups, member_groups, viewer_groups) = tokio::try_join!(
            self.default_group_principals(project),
            self.extra_group_principals(project, Role::Administrator),
            self.extra_group_principals(project, Role::Member),
            self.extra_group_principals(project, Role::Viewer),
        )?;

        membership.administrators.extend(admin_groups);
        membership.members.extend(member_groups);
        membership.viewers.extend(viewer_groups);
        Ok(membership)
    }

    /// Users of every role's default group, each distinct user resolved once.
    async fn default_group_principals(
        &self,
        project: &ProjectRecord,
    ) -> Result<RoleMembership, AggregationError> {
        let (admins, members, viewers) = tokio::try_join!(
            self.default_group_members(project, Role::Administrator),
            self.default_group_members(project, Role::Member),
            self.default_group_members(project, Role::Viewer),
        )?;

        let role_to_users: [(Role, Vec<String>); 3] = [
            (Role::Administrator, admins),
            (Role::Member, members),
            (Role::Viewer, viewers),
        ];

        let unique_users: IndexSet<&String> = role_to_users
            .iter()
            .flat_map(|(_, users)| users.iter())
            .collect();
        let user_to_principal: HashMap<String, Principal> =
            self.resolver.resolve_all(unique_users).await?;

        let mut membership = RoleMembership::default();
        for (role, users) in &role_to_users {
            let principals = membership.get_mut(*role);
            for user in users {
                if let Some(principal) = user_to_principal.get(user) {
                    principals.push(principal.clone());
                }
            }
        }
        Ok(membership)
    }

    /// User ids in the default group of `role`.
    ///
    /// A default group that was never provisioned is empty, unless the
    /// project links it explicitly, in which case it must exist.
    async fn default_group_members(
        &self,
        project: &ProjectRecord,
        role: Role,
    ) -> Result<Vec<String>, AggregationError> {
        let group = default_group_link(role, &project.id);
        let declared = project.group_links(role).iter().any(|l| l == &group);

        match bounded("list group members", self.timeout, self.groups.list_members(&group)).await {
            Ok(users) => Ok(users),
            Err(RepoError::NotFound { .. }) if !declared => {
                tracing::debug!(project_id = %project.id, %role, %group, "Default group not provisioned");
                Ok(Vec::new())
            }
            Err(source) => {
                tracing::warn!(project_id = %project.id, %role, %group, error = %source, "Failed to list default group members");
                Err(AggregationError::GroupMembers { group, source })
            }
        }
    }

    /// The extra groups linked for `role`, resolved as group principals in
    /// link order. The role's default group is excluded.
    async fn extra_group_principals(
        &self,
        project: &ProjectRecord,
        role: Role,
    ) -> Result<Vec<Principal>, AggregationError> {
        let extra = extra_group_links(project, role);
        let lookups = extra.iter().map(|link| async move {
            let id = link_id(link);
            self.resolver
                .resolve(id)
                .await
                .map_err(|source| AggregationError::Principal {
                    id: id.to_string(),
                    source,
                })
        });
        try_join_all(lookups).await
    }
}

/// Links of `role` minus duplicates and minus the role's default group.
pub fn extra_group_links(project: &ProjectRecord, role: Role) -> Vec<Link> {
    let default = default_group_link(role, &project.id);
    let unique: IndexSet<&Link> = project
        .group_links(role)
        .iter()
        .filter(|link| **link != default)
        .collect();
    unique.into_iter().cloned().collect()
}
