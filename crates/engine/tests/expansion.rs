mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use roster_core::principal::{Principal, PrincipalKind};
use roster_core::project::{ProjectRecord, CUSTOM_PROPERTY_PROJECT_INDEX};
use roster_core::query::{CLUSTER_KIND, TEMPLATE_KIND};
use roster_core::roles::{default_group_link, Role};
use roster_db::RepoError;
use roster_engine::{EngineError, ExpansionError, ProjectExpander};
use roster_registry::MemoryRegistry;

use common::{test_config, FailingDocumentIndex, FailingGroupDirectory, Fixture, SlowRegistry};

const G1: &str = "/core/authz/user-groups/g1";

fn with_index(mut project: ProjectRecord, index: &str) -> ProjectRecord {
    project
        .custom_properties
        .insert(CUSTOM_PROPERTY_PROJECT_INDEX.into(), index.into());
    project
}

#[tokio::test]
async fn project_without_links_skips_membership_lookups() {
    let fixture = Fixture::new();
    fixture.documents.insert(CLUSTER_KIND, "/resources/clusters/c1", &["/projects/p1"]).await;
    fixture.documents.insert(TEMPLATE_KIND, "/templates/t1", &["/projects/p1"]).await;

    let expander = ProjectExpander::new(&fixture.collaborators(), &test_config());
    let view = expander.expand(ProjectRecord::new("p1", "Alpha")).await.unwrap();

    assert!(view.administrators.is_empty());
    assert!(view.members.is_empty());
    assert!(view.viewers.is_empty());
    assert_eq!(view.cluster_links, vec!["/resources/clusters/c1"]);
    assert_eq!(view.template_links, vec!["/templates/t1"]);
    assert_eq!(fixture.groups.calls(), 0);
    assert_eq!(fixture.principals.calls(), 0);
}

#[tokio::test]
async fn extra_group_resolves_as_group_principal() {
    let fixture = Fixture::new();
    fixture.user("u1", "Ann").await;
    fixture.user("u2", "Bo").await;
    fixture.group(G1, "Group One", &["u1", "u2"]).await;
    fixture
        .groups
        .inner
        .insert_group(default_group_link(Role::Administrator, "p1"), &[])
        .await;

    let mut project = ProjectRecord::new("p1", "P1");
    project.administrator_group_links = vec![G1.into()];

    let expander = ProjectExpander::new(&fixture.collaborators(), &test_config());
    let view = expander.expand(project).await.unwrap();

    assert_eq!(view.administrators, vec![Principal::group("g1", "Group One")]);
    assert_eq!(view.administrators[0].kind, PrincipalKind::Group);
    assert!(view.members.is_empty());
}

#[tokio::test]
async fn default_members_come_before_extra_groups() {
    let fixture = Fixture::new();
    fixture.user("u1", "Ann").await;
    fixture.user("u2", "Bo").await;
    fixture.group(G1, "Group One", &["u2"]).await;
    let default_members = default_group_link(Role::Member, "p1");
    fixture.groups.inner.insert_group(default_members.clone(), &["u2", "u1"]).await;

    let mut project = ProjectRecord::new("p1", "P1");
    project.member_group_links = vec![G1.into(), default_members.clone(), G1.into()];

    let expander = ProjectExpander::new(&fixture.collaborators(), &test_config());
    let view = expander.expand(project).await.unwrap();

    let ids: Vec<&str> = view.members.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["u2", "u1", "g1"]);
}

#[tokio::test]
async fn duplicates_across_sources_are_kept() {
    let fixture = Fixture::new();
    fixture.user("g1", "Shadow user").await;
    fixture.groups.inner.insert_group(G1, &[]).await;
    let default_viewers = default_group_link(Role::Viewer, "p1");
    fixture.groups.inner.insert_group(default_viewers.clone(), &["g1"]).await;

    let mut project = ProjectRecord::new("p1", "P1");
    project.viewer_group_links = vec![default_viewers, G1.into()];

    let expander = ProjectExpander::new(&fixture.collaborators(), &test_config());
    let view = expander.expand(project).await.unwrap();

    assert_eq!(view.viewers.len(), 2);
    assert_eq!(view.viewers[0], view.viewers[1]);
}

#[tokio::test]
async fn user_in_several_default_groups_is_resolved_once() {
    let fixture = Fixture::new();
    fixture.user("u1", "Ann").await;
    for role in Role::ALL {
        fixture.groups.inner.insert_group(default_group_link(role, "p1"), &["u1"]).await;
    }

    let mut project = ProjectRecord::new("p1", "P1");
    project.administrator_group_links = vec![default_group_link(Role::Administrator, "p1")];

    let expander = ProjectExpander::new(&fixture.collaborators(), &test_config());
    let view = expander.expand(project).await.unwrap();

    assert_eq!(view.administrators.len(), 1);
    assert_eq!(view.members.len(), 1);
    assert_eq!(view.viewers.len(), 1);
    assert_eq!(fixture.principals.calls(), 1);
    assert_eq!(fixture.groups.calls(), 3);
}

#[tokio::test]
async fn repositories_sum_tag_counts() {
    let registry = MemoryRegistry::new().with_listing(
        "42",
        r#"[{"name": "p1/web", "tags_count": 3}, {"name": "p1/db", "tags_count": 2}]"#,
    );
    let fixture = Fixture::with_registry(Arc::new(registry));

    let expander = ProjectExpander::new(&fixture.collaborators(), &test_config());
    let view = expander
        .expand(with_index(ProjectRecord::new("p1", "P1"), "42"))
        .await
        .unwrap();

    assert_eq!(view.repositories, vec!["p1/web", "p1/db"]);
    assert_eq!(view.number_of_images, 5);
}

#[tokio::test]
async fn oversized_tag_counts_saturate() {
    let registry = MemoryRegistry::new().with_listing(
        "42",
        r#"[{"name": "p1/x", "tags_count": 18446744073709551615}, {"name": "p1/y", "tags_count": 1}]"#,
    );
    let fixture = Fixture::with_registry(Arc::new(registry));

    let expander = ProjectExpander::new(&fixture.collaborators(), &test_config());
    let view = expander
        .expand(with_index(ProjectRecord::new("p1", "P1"), "42"))
        .await
        .unwrap();

    assert_eq!(view.repositories, vec!["p1/x", "p1/y"]);
    assert_eq!(view.number_of_images, u64::MAX);
}

#[tokio::test(start_paused = true)]
async fn registry_timeout_still_yields_a_full_view() {
    let fixture = Fixture::with_registry(Arc::new(SlowRegistry));
    fixture.user("u1", "Ann").await;
    let default_admins = default_group_link(Role::Administrator, "p1");
    fixture.groups.inner.insert_group(default_admins.clone(), &["u1"]).await;
    fixture.documents.insert(CLUSTER_KIND, "/resources/clusters/c1", &["/projects/p1"]).await;

    let mut project = with_index(ProjectRecord::new("p1", "P1"), "42");
    project.administrator_group_links = vec![default_admins];

    let expander = ProjectExpander::new(&fixture.collaborators(), &test_config());
    let view = expander.expand(project).await.unwrap();

    assert!(view.repositories.is_empty());
    assert_eq!(view.number_of_images, 0);
    assert_eq!(view.administrators.len(), 1);
    assert_eq!(view.cluster_links, vec!["/resources/clusters/c1"]);
}

#[tokio::test]
async fn membership_failure_fails_the_expansion() {
    let fixture = Fixture::new();
    let mut collaborators = fixture.collaborators();
    collaborators.groups = Arc::new(FailingGroupDirectory);

    let mut project = ProjectRecord::new("p1", "P1");
    project.member_group_links = vec![G1.into()];

    let expander = ProjectExpander::new(&collaborators, &test_config());
    let err = expander.expand(project).await.unwrap_err();

    assert_matches!(err, ExpansionError::Aggregation(_));
    assert_matches!(err.root_cause(), RepoError::Transport(_));
}

#[tokio::test]
async fn declared_default_group_must_exist() {
    let fixture = Fixture::new();
    let mut project = ProjectRecord::new("p1", "P1");
    project.viewer_group_links = vec![default_group_link(Role::Viewer, "p1")];

    let expander = ProjectExpander::new(&fixture.collaborators(), &test_config());
    let err = expander.expand(project).await.unwrap_err();

    assert_matches!(err.root_cause(), RepoError::NotFound { .. });
}

#[tokio::test]
async fn unknown_extra_group_fails_the_expansion() {
    let fixture = Fixture::new();
    let mut project = ProjectRecord::new("p1", "P1");
    project.administrator_group_links = vec!["/core/authz/user-groups/ghost".into()];

    let expander = ProjectExpander::new(&fixture.collaborators(), &test_config());
    let err = expander.expand(project).await.unwrap_err();

    assert_matches!(err, ExpansionError::Aggregation(roster_engine::AggregationError::Principal { id, .. }) if id == "ghost");
}

#[tokio::test]
async fn cluster_lookup_failure_fails_the_expansion() {
    let fixture = Fixture::new();
    let mut collaborators = fixture.collaborators();
    collaborators.documents = Arc::new(FailingDocumentIndex);

    let expander = ProjectExpander::new(&collaborators, &test_config());
    let err = expander.expand(ProjectRecord::new("p1", "P1")).await.unwrap_err();

    assert_matches!(
        err,
        ExpansionError::ClusterLinks(RepoError::Transport(_))
            | ExpansionError::TemplateLinks(RepoError::Transport(_))
    );
}

#[tokio::test]
async fn service_expand_reports_missing_project() {
    let fixture = Fixture::new();
    let err = fixture.service().expand("nope").await.unwrap_err();
    assert_matches!(err, EngineError::Core(roster_core::error::CoreError::NotFound { .. }));
}
