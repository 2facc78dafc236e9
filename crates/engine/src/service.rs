//! Project service: the create / read / replace / update / delete verbs.
//!
//! Every verb validates its input before touching a collaborator. Mutations
//! are computed on an in-memory copy and written with a single store call;
//! a mutation that leaves the signature unchanged is reported as
//! [`UpdateOutcome::NotModified`] and publishes no event.

use std::sync::Arc;
use std::time::Duration;

use roster_core::error::CoreError;
use roster_core::index::generate_project_index;
use roster_core::merge::{apply_roles_update, merge_patch, normalize_project_links, MergeOutcome};
use roster_core::project::{
    ExpandedProjectView, ProjectPatch, ProjectRecord, ProjectRolesUpdate, ProjectUpdate,
    DEFAULT_PROJECT_ID,
};
use roster_core::query::{
    all_projects_query, fold_case, group_membership_query, index_lookup_query, name_uniqueness_query,
    Query,
};
use roster_core::roles::{default_group_link, Role};
use roster_core::signature::compute_signature;
use roster_core::types::{link_id, Link, ProjectIndex};
use roster_db::{GroupDirectory, ProjectStore, RepoError};
use serde::Serialize;
use uuid::Uuid;

use crate::access::{AccessPolicy, Caller, RoleAccessPolicy};
use crate::config::EngineConfig;
use crate::deletion::DeletionGuard;
use crate::error::EngineError;
use crate::events::{
    ProjectEvent, ProjectEventBus, EVENT_PROJECT_CREATED, EVENT_PROJECT_DELETED,
    EVENT_PROJECT_ROLES_UPDATED, EVENT_PROJECT_UPDATED,
};
use crate::expansion::ProjectExpander;
use crate::principal::PrincipalResolver;
use crate::timeout::bounded;
use crate::Collaborators;

/// Draws before giving up on finding an unused project index.
const MAX_INDEX_ATTEMPTS: usize = 5;

/// Re-read and re-merge rounds for a patch that lost a write race.
const MAX_WRITE_ATTEMPTS: usize = 5;

/// Roles whose default groups are provisioned on privileged create.
const PROVISIONED_ROLES: [Role; 2] = [Role::Administrator, Role::Member];

/// Result of `read`: the stored record or its expanded view.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ProjectRead {
    Record(ProjectRecord),
    Expanded(Box<ExpandedProjectView>),
}

/// Result of a mutating verb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated(ProjectRecord),
    /// The request left the project as it was; nothing was written.
    NotModified(ProjectRecord),
}

impl UpdateOutcome {
    pub fn record(&self) -> &ProjectRecord {
        match self {
            UpdateOutcome::Updated(record) | UpdateOutcome::NotModified(record) => record,
        }
    }

    pub fn into_record(self) -> ProjectRecord {
        match self {
            UpdateOutcome::Updated(record) | UpdateOutcome::NotModified(record) => record,
        }
    }

    pub fn is_modified(&self) -> bool {
        matches!(self, UpdateOutcome::Updated(_))
    }
}

pub struct ProjectService {
    projects: Arc<dyn ProjectStore>,
    groups: Arc<dyn GroupDirectory>,
    resolver: PrincipalResolver,
    expander: ProjectExpander,
    guard: DeletionGuard,
    policy: Arc<dyn AccessPolicy>,
    events: Arc<ProjectEventBus>,
    timeout: Duration,
}

impl ProjectService {
    pub fn new(collaborators: Collaborators, config: EngineConfig) -> Self {
        let timeout = config.collaborator_timeout;
        Self {
            expander: ProjectExpander::new(&collaborators, &config),
            guard: DeletionGuard::new(Arc::clone(&collaborators.documents), timeout),
            resolver: PrincipalResolver::new(Arc::clone(&collaborators.principals), timeout),
            projects: collaborators.projects,
            groups: collaborators.groups,
            policy: Arc::new(RoleAccessPolicy),
            events: Arc::new(ProjectEventBus::default()),
            timeout,
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn AccessPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_event_bus(mut self, events: Arc<ProjectEventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn events(&self) -> &Arc<ProjectEventBus> {
        &self.events
    }

    // -----------------------------------------------------------------------
    // Create
    // -----------------------------------------------------------------------

    /// Create a project.
    ///
    /// A missing id is generated and a missing external index is drawn at
    /// random. Privileged callers also get the administrator and member
    /// default groups, with themselves as the only member.
    pub async fn create(&self, caller: &Caller, mut project: ProjectRecord) -> Result<ProjectRecord, EngineError> {
        project.validate_fields()?;
        normalize_project_links(&mut project)?;
        if project.id.trim().is_empty() {
            project.id = Uuid::new_v4().to_string();
        }

        self.ensure_unique_name(&project).await?;
        match project.parsed_project_index()? {
            Some(index) => self.ensure_index_free(&project, index).await?,
            None => self.assign_project_index(&mut project).await?,
        }

        if self.policy.is_privileged(caller) {
            self.provision_default_groups(caller, &mut project).await?;
        } else {
            tracing::debug!(user_id = %caller.user_id, "Non-privileged create, skipping group provisioning");
        }

        let created = bounded("create project", self.timeout, self.projects.create(&project))
            .await
            .map_err(|e| store_error(&project.id, e))?;

        tracing::info!(project_id = %created.id, name = %created.name, "Project created");
        self.publish(EVENT_PROJECT_CREATED, caller, &created);
        Ok(created)
    }

    /// Create the well-known default project unless it already exists.
    pub async fn ensure_default_project(&self) -> Result<ProjectRecord, EngineError> {
        if let Some(existing) = self.find_by_id(DEFAULT_PROJECT_ID).await? {
            return Ok(existing);
        }

        let project = ProjectRecord::default_project();
        match bounded("create project", self.timeout, self.projects.create(&project)).await {
            Ok(created) => {
                tracing::info!(project_id = %created.id, "Default project created");
                Ok(created)
            }
            Err(RepoError::AlreadyExists { .. }) => self.get(DEFAULT_PROJECT_ID).await,
            Err(e) => Err(e.into()),
        }
    }

    // -----------------------------------------------------------------------
    // Read
    // -----------------------------------------------------------------------

    pub async fn get(&self, id: &str) -> Result<ProjectRecord, EngineError> {
        self.find_by_id(id).await?.ok_or_else(|| {
            CoreError::NotFound {
                entity: "Project",
                id: id.to_string(),
            }
            .into()
        })
    }

    pub async fn read(&self, id: &str, expand: bool) -> Result<ProjectRead, EngineError> {
        if expand {
            Ok(ProjectRead::Expanded(Box::new(self.expand(id).await?)))
        } else {
            Ok(ProjectRead::Record(self.get(id).await?))
        }
    }

    pub async fn expand(&self, id: &str) -> Result<ExpandedProjectView, EngineError> {
        let project = self.get(id).await?;
        Ok(self.expander.expand(project).await?)
    }

    /// Every project, ordered by name.
    pub async fn list(&self) -> Result<Vec<ProjectRecord>, EngineError> {
        let mut projects = self.find(&all_projects_query()).await?;
        projects.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(projects)
    }

    /// Projects with any of `group_links` in any role.
    pub async fn projects_for_groups(&self, group_links: &[Link]) -> Result<Vec<ProjectRecord>, EngineError> {
        if group_links.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.find(&group_membership_query(group_links)).await?)
    }

    // -----------------------------------------------------------------------
    // Replace / update
    // -----------------------------------------------------------------------

    /// Overwrite a project with `replacement`.
    ///
    /// The external index cannot change; a replacement that omits it keeps
    /// the current one. Changing role links requires privilege.
    pub async fn replace(
        &self,
        caller: &Caller,
        id: &str,
        mut replacement: ProjectRecord,
    ) -> Result<UpdateOutcome, EngineError> {
        replacement.validate_fields()?;
        normalize_project_links(&mut replacement)?;
        if !replacement.id.is_empty() && replacement.id != id {
            return Err(CoreError::Validation(format!(
                "body id '{}' does not match path id '{id}'",
                replacement.id
            ))
            .into());
        }
        replacement.id = id.to_string();

        let current = self.get(id).await?;
        carry_project_index(&current, &mut replacement)?;

        let roles_changed = Role::ALL
            .iter()
            .any(|r| current.group_links(*r) != replacement.group_links(*r));
        if roles_changed && !self.policy.is_privileged(caller) {
            return Err(CoreError::Forbidden("changing project roles requires administrator rights".into()).into());
        }

        if compute_signature(&current) == compute_signature(&replacement) {
            tracing::debug!(project_id = %id, "Replacement leaves project unchanged");
            return Ok(UpdateOutcome::NotModified(current));
        }

        if name_changed(&current, &replacement) {
            self.ensure_unique_name(&replacement).await?;
        }
        self.ensure_new_index_free(&current, &replacement).await?;
        if roles_changed {
            self.ensure_groups_exist(&current, &replacement).await?;
        }

        let stored = self
            .put(&replacement, &current)
            .await
            .map_err(|e| store_error(id, e))?;
        self.publish(EVENT_PROJECT_UPDATED, caller, &stored);
        Ok(UpdateOutcome::Updated(stored))
    }

    /// Apply a field patch or a roles update.
    pub async fn update(&self, caller: &Caller, id: &str, update: ProjectUpdate) -> Result<UpdateOutcome, EngineError> {
        match update {
            ProjectUpdate::Patch(patch) => self.patch(caller, id, &patch).await,
            ProjectUpdate::Roles(roles) => self.update_roles(caller, id, &roles).await,
        }
    }

    async fn patch(&self, caller: &Caller, id: &str, patch: &ProjectPatch) -> Result<UpdateOutcome, EngineError> {
        if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(CoreError::Validation("name must not be blank".into()).into());
        }

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let current = self.get(id).await?;
            let MergeOutcome { merged, changed } = merge_patch(&current, patch);
            if !changed {
                tracing::debug!(project_id = %id, "Patch leaves project unchanged");
                return Ok(UpdateOutcome::NotModified(current));
            }

            merged.validate_fields()?;
            if name_changed(&current, &merged) {
                self.ensure_unique_name(&merged).await?;
            }
            self.ensure_new_index_free(&current, &merged).await?;

            match self.put(&merged, &current).await {
                Ok(stored) => {
                    self.publish(EVENT_PROJECT_UPDATED, caller, &stored);
                    return Ok(UpdateOutcome::Updated(stored));
                }
                Err(RepoError::Stale { .. }) => {
                    tracing::debug!(project_id = %id, attempt, "Project changed under patch, merging again");
                }
                Err(e) => return Err(store_error(id, e)),
            }
        }
        Err(concurrent_modification(id))
    }

    /// Replace role group links. Privileged callers only.
    ///
    /// Newly linked groups must resolve as principals.
    async fn update_roles(
        &self,
        caller: &Caller,
        id: &str,
        roles: &ProjectRolesUpdate,
    ) -> Result<UpdateOutcome, EngineError> {
        if !self.policy.is_privileged(caller) {
            tracing::info!(user_id = %caller.user_id, project_id = %id, "Roles update refused");
            return Err(CoreError::Forbidden("only administrators can update project roles".into()).into());
        }

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let current = self.get(id).await?;
            let MergeOutcome { merged, changed } = apply_roles_update(&current, roles)?;
            if !changed {
                tracing::debug!(project_id = %id, "Roles update leaves project unchanged");
                return Ok(UpdateOutcome::NotModified(current));
            }

            self.ensure_groups_exist(&current, &merged).await?;

            match self.put(&merged, &current).await {
                Ok(stored) => {
                    tracing::info!(project_id = %id, user_id = %caller.user_id, "Project roles updated");
                    self.publish(EVENT_PROJECT_ROLES_UPDATED, caller, &stored);
                    return Ok(UpdateOutcome::Updated(stored));
                }
                Err(RepoError::Stale { .. }) => {
                    tracing::debug!(project_id = %id, attempt, "Project changed under roles update, applying again");
                }
                Err(e) => return Err(store_error(id, e)),
            }
        }
        Err(concurrent_modification(id))
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    /// Delete a project no placement references.
    pub async fn delete(&self, caller: &Caller, id: &str) -> Result<ProjectRecord, EngineError> {
        let current = self.get(id).await?;
        self.guard.ensure_deletable(&current.self_link()).await?;

        let removed = bounded("delete project", self.timeout, self.projects.delete(id)).await?;
        if !removed {
            return Err(CoreError::NotFound {
                entity: "Project",
                id: id.to_string(),
            }
            .into());
        }

        tracing::info!(project_id = %id, user_id = %caller.user_id, "Project deleted");
        self.publish(EVENT_PROJECT_DELETED, caller, &current);
        Ok(current)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn find_by_id(&self, id: &str) -> Result<Option<ProjectRecord>, RepoError> {
        bounded("get project", self.timeout, self.projects.get(id)).await
    }

    async fn find(&self, query: &Query) -> Result<Vec<ProjectRecord>, RepoError> {
        bounded("find projects", self.timeout, self.projects.find(query)).await
    }

    /// Write `project` unless the stored record has moved on from `read`.
    async fn put(&self, project: &ProjectRecord, read: &ProjectRecord) -> Result<ProjectRecord, RepoError> {
        let expected = compute_signature(read);
        bounded("put project", self.timeout, self.projects.put(project, &expected)).await
    }

    async fn ensure_unique_name(&self, project: &ProjectRecord) -> Result<(), EngineError> {
        let query = name_uniqueness_query(&project.name, &project.self_link());
        if !self.find(&query).await?.is_empty() {
            return Err(CoreError::Conflict(format!("project name '{}' is already in use", project.name)).into());
        }
        Ok(())
    }

    async fn ensure_index_free(&self, project: &ProjectRecord, index: ProjectIndex) -> Result<(), EngineError> {
        let holders = self.find(&index_lookup_query(index)).await?;
        if holders.iter().any(|p| p.id != project.id) {
            return Err(CoreError::Conflict(format!("project index {index} is already in use")).into());
        }
        Ok(())
    }

    /// Check an index being set on a project that had none.
    async fn ensure_new_index_free(&self, current: &ProjectRecord, updated: &ProjectRecord) -> Result<(), EngineError> {
        if current.project_index().is_some() {
            return Ok(());
        }
        match updated.parsed_project_index()? {
            Some(index) => self.ensure_index_free(updated, index).await,
            None => Ok(()),
        }
    }

    async fn assign_project_index(&self, project: &mut ProjectRecord) -> Result<(), EngineError> {
        for attempt in 1..=MAX_INDEX_ATTEMPTS {
            let index = generate_project_index();
            if self.find(&index_lookup_query(index)).await?.is_empty() {
                project.set_project_index(index);
                return Ok(());
            }
            tracing::debug!(attempt, index, "Project index already taken, drawing again");
        }
        Err(CoreError::Conflict("unable to assign a unique project index".into()).into())
    }

    async fn provision_default_groups(&self, caller: &Caller, project: &mut ProjectRecord) -> Result<(), EngineError> {
        let owner = [caller.user_id.clone()];
        let [admin_group, member_group] =
            PROVISIONED_ROLES.map(|role| default_group_link(role, &project.id));

        tokio::try_join!(
            self.provision_group(&admin_group, &owner),
            self.provision_group(&member_group, &owner),
        )?;

        for (role, group) in PROVISIONED_ROLES.into_iter().zip([admin_group, member_group]) {
            let links = project.group_links_mut(role);
            if !links.contains(&group) {
                links.insert(0, group);
            }
        }
        Ok(())
    }

    async fn provision_group(&self, group_link: &str, members: &[String]) -> Result<(), RepoError> {
        match bounded("create group", self.timeout, self.groups.create_group(group_link, members)).await {
            Ok(()) => Ok(()),
            Err(RepoError::AlreadyExists { .. }) => {
                tracing::debug!(group = %group_link, "Default group already provisioned");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Resolve every group link `merged` adds over `current`.
    async fn ensure_groups_exist(&self, current: &ProjectRecord, merged: &ProjectRecord) -> Result<(), EngineError> {
        let mut added: Vec<&Link> = Vec::new();
        for role in Role::ALL {
            let default = default_group_link(role, &merged.id);
            added.extend(
                merged
                    .group_links(role)
                    .iter()
                    .filter(|l| **l != default && !current.group_links(role).contains(*l)),
            );
        }
        added.sort();
        added.dedup();

        let lookups = added.into_iter().map(|link| async move {
            match self.resolver.resolve(link_id(link)).await {
                Ok(_) => Ok(()),
                Err(RepoError::NotFound { .. }) => {
                    Err(EngineError::from(CoreError::Validation(format!("unknown group '{link}'"))))
                }
                Err(e) => Err(e.into()),
            }
        });
        futures::future::try_join_all(lookups).await?;
        Ok(())
    }

    fn publish(&self, event_type: &str, caller: &Caller, project: &ProjectRecord) {
        self.events.publish(
            ProjectEvent::new(event_type, project.self_link())
                .with_actor(caller.user_id.clone())
                .with_payload(serde_json::json!({ "name": project.name })),
        );
    }
}

/// Whether a rename moves the project to a different name under the
/// case folding that name uniqueness uses.
fn name_changed(current: &ProjectRecord, updated: &ProjectRecord) -> bool {
    fold_case(&current.name) != fold_case(&updated.name)
}

/// Keep the current external index on a replacement and refuse to change it.
fn carry_project_index(current: &ProjectRecord, replacement: &mut ProjectRecord) -> Result<(), CoreError> {
    let Some(index) = current.parsed_project_index()? else {
        return Ok(());
    };
    match replacement.parsed_project_index()? {
        None => replacement.set_project_index(index),
        Some(other) if other != index => {
            return Err(CoreError::Validation(format!(
                "project index is immutable (current {index}, got {other})"
            )));
        }
        Some(_) => {}
    }
    Ok(())
}

fn concurrent_modification(id: &str) -> EngineError {
    CoreError::Conflict(format!("project '{id}' is being modified concurrently, retry the request")).into()
}

fn store_error(id: &str, err: RepoError) -> EngineError {
    match err {
        RepoError::AlreadyExists { .. } => CoreError::Conflict(format!("project '{id}' already exists")).into(),
        RepoError::Stale { .. } => concurrent_modification(id),
        RepoError::NotFound { .. } => CoreError::NotFound {
            entity: "Project",
            id: id.to_string(),
        }
        .into(),
        other => other.into(),
    }
}
