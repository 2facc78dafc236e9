//! Document predicates.
//!
//! A [`Query`] is a boolean tree of term matches over indexed documents,
//! with must / should / must-not occurrence like a Lucene boolean query.
//! Documents are JSON objects; [`Query::matches`] evaluates a predicate in
//! process so in-memory indexes and tests share the exact semantics of the
//! builders below.

use std::fmt;

use serde_json::Value;

use crate::project::{ProjectRecord, CUSTOM_PROPERTY_PROJECT_INDEX, PROJECT_KIND};
use crate::types::ProjectIndex;

// ---------------------------------------------------------------------------
// Field names
// ---------------------------------------------------------------------------

pub const FIELD_KIND: &str = "documentKind";
pub const FIELD_SELF_LINK: &str = "documentSelfLink";
pub const FIELD_NAME: &str = "name";
pub const FIELD_TENANT_LINKS: &str = "tenantLinks";
pub const FIELD_CUSTOM_PROPERTIES: &str = "customProperties";
pub const FIELD_ADMINISTRATOR_GROUP_LINKS: &str = "administratorGroupLinks";
pub const FIELD_MEMBER_GROUP_LINKS: &str = "memberGroupLinks";
pub const FIELD_VIEWER_GROUP_LINKS: &str = "viewerGroupLinks";

/// Kinds of documents a project can be associated with.
pub const CLUSTER_KIND: &str = "cluster";
pub const TEMPLATE_KIND: &str = "template";
pub const PLACEMENT_KIND: &str = "placement";

// ---------------------------------------------------------------------------
// Query model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occurrence {
    Must,
    Should,
    MustNot,
}

/// Where a term looks inside a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPath {
    /// A scalar top-level field.
    Field(String),
    /// Any item of a top-level array field.
    CollectionItem(String),
    /// One entry of a top-level string map.
    MapEntry { map: String, key: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub occurrence: Occurrence,
    pub query: Query,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Term {
        field: FieldPath,
        value: String,
        case_insensitive: bool,
    },
    Boolean(Vec<Clause>),
}

impl Query {
    pub fn term(field: FieldPath, value: impl Into<String>) -> Self {
        Query::Term {
            field,
            value: value.into(),
            case_insensitive: false,
        }
    }

    pub fn term_ci(field: FieldPath, value: impl Into<String>) -> Self {
        Query::Term {
            field,
            value: value.into(),
            case_insensitive: true,
        }
    }

    /// Match documents of the given kind.
    pub fn kind(kind: &str) -> Self {
        Query::term(FieldPath::Field(FIELD_KIND.to_string()), kind)
    }

    /// Match when `field` equals any of `values`.
    ///
    /// A single value collapses to a plain term; an empty list matches
    /// nothing.
    pub fn any_of<S: AsRef<str>>(field: FieldPath, values: &[S], case_insensitive: bool) -> Self {
        let mut terms: Vec<Query> = values
            .iter()
            .map(|v| Query::Term {
                field: field.clone(),
                value: v.as_ref().to_string(),
                case_insensitive,
            })
            .collect();
        if terms.len() == 1 {
            return terms.remove(0);
        }
        Query::Boolean(
            terms
                .into_iter()
                .map(|query| Clause {
                    occurrence: Occurrence::Should,
                    query,
                })
                .collect(),
        )
    }

    /// Evaluate the predicate against a JSON document.
    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Query::Term {
                field,
                value,
                case_insensitive,
            } => field_values(doc, field)
                .iter()
                .any(|candidate| term_eq(candidate, value, *case_insensitive)),
            Query::Boolean(clauses) => {
                if clauses.is_empty() {
                    return false;
                }
                let mut has_must = false;
                let mut has_should = false;
                let mut any_should = false;
                for clause in clauses {
                    let hit = clause.query.matches(doc);
                    match clause.occurrence {
                        Occurrence::Must => {
                            has_must = true;
                            if !hit {
                                return false;
                            }
                        }
                        Occurrence::MustNot => {
                            if hit {
                                return false;
                            }
                        }
                        Occurrence::Should => {
                            has_should = true;
                            any_should |= hit;
                        }
                    }
                }
                if has_must || !has_should {
                    // Pure must-not trees never match on their own.
                    return has_must;
                }
                any_should
            }
        }
    }
}

/// Case folding used by case-insensitive terms.
pub fn fold_case(value: &str) -> String {
    value.to_lowercase()
}

fn term_eq(candidate: &str, value: &str, case_insensitive: bool) -> bool {
    if case_insensitive {
        fold_case(candidate) == fold_case(value)
    } else {
        candidate == value
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn field_values(doc: &Value, field: &FieldPath) -> Vec<String> {
    match field {
        FieldPath::Field(name) => doc.get(name).and_then(scalar).into_iter().collect(),
        FieldPath::CollectionItem(name) => doc
            .get(name)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(scalar).collect())
            .unwrap_or_default(),
        FieldPath::MapEntry { map, key } => doc
            .get(map)
            .and_then(|m| m.get(key))
            .and_then(scalar)
            .into_iter()
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldPath::Field(name) => f.write_str(name),
            FieldPath::CollectionItem(name) => write!(f, "{name}.item"),
            FieldPath::MapEntry { map, key } => write!(f, "{map}.{key}"),
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Term {
                field,
                value,
                case_insensitive,
            } => {
                write!(f, "{field}:{value:?}")?;
                if *case_insensitive {
                    f.write_str("~i")?;
                }
                Ok(())
            }
            Query::Boolean(clauses) => {
                f.write_str("(")?;
                for (i, clause) in clauses.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    match clause.occurrence {
                        Occurrence::Must => f.write_str("+")?,
                        Occurrence::MustNot => f.write_str("-")?,
                        Occurrence::Should => {}
                    }
                    write!(f, "{}", clause.query)?;
                }
                f.write_str(")")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

fn must(query: Query) -> Clause {
    Clause {
        occurrence: Occurrence::Must,
        query,
    }
}

fn should(query: Query) -> Clause {
    Clause {
        occurrence: Occurrence::Should,
        query,
    }
}

fn must_not(query: Query) -> Clause {
    Clause {
        occurrence: Occurrence::MustNot,
        query,
    }
}

/// Projects that list any of `group_links` under any role.
pub fn group_membership_query<S: AsRef<str>>(group_links: &[S]) -> Query {
    let by_role = [
        FIELD_ADMINISTRATOR_GROUP_LINKS,
        FIELD_MEMBER_GROUP_LINKS,
        FIELD_VIEWER_GROUP_LINKS,
    ]
    .into_iter()
    .map(|field| {
        should(Query::any_of(
            FieldPath::CollectionItem(field.to_string()),
            group_links,
            false,
        ))
    })
    .collect();

    Query::Boolean(vec![must(Query::kind(PROJECT_KIND)), must(Query::Boolean(by_role))])
}

/// Projects named `name` (case-insensitive), other than the one at `exclude_self_link`.
pub fn name_uniqueness_query(name: &str, exclude_self_link: &str) -> Query {
    Query::Boolean(vec![
        must(Query::kind(PROJECT_KIND)),
        must(Query::term_ci(FieldPath::Field(FIELD_NAME.to_string()), name)),
        must_not(Query::term_ci(
            FieldPath::Field(FIELD_SELF_LINK.to_string()),
            exclude_self_link,
        )),
    ])
}

/// Projects whose external index custom property equals `index`.
pub fn index_lookup_query(index: ProjectIndex) -> Query {
    Query::term_ci(
        FieldPath::MapEntry {
            map: FIELD_CUSTOM_PROPERTIES.to_string(),
            key: CUSTOM_PROPERTY_PROJECT_INDEX.to_string(),
        },
        index.to_string(),
    )
}

/// Documents of `kind` associated with the project at `project_link`.
pub fn project_resources_query(kind: &str, project_link: &str) -> Query {
    Query::Boolean(vec![
        must(Query::kind(kind)),
        must(Query::term(
            FieldPath::CollectionItem(FIELD_TENANT_LINKS.to_string()),
            project_link,
        )),
    ])
}

/// Every project document.
pub fn all_projects_query() -> Query {
    Query::kind(PROJECT_KIND)
}

/// The indexed form of a project record.
pub fn project_document(project: &ProjectRecord) -> Value {
    serde_json::json!({
        FIELD_KIND: PROJECT_KIND,
        FIELD_SELF_LINK: project.self_link(),
        "id": project.id,
        FIELD_NAME: project.name,
        "description": project.description,
        "isPublic": project.is_public,
        FIELD_ADMINISTRATOR_GROUP_LINKS: project.administrator_group_links,
        FIELD_MEMBER_GROUP_LINKS: project.member_group_links,
        FIELD_VIEWER_GROUP_LINKS: project.viewer_group_links,
        FIELD_CUSTOM_PROPERTIES: project.custom_properties,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn fold_case_covers_non_ascii() {
        assert_eq!(fold_case("ÉCLAIR"), fold_case("éclair"));
        assert_ne!(fold_case("Éclair"), fold_case("Eclair"));
    }

    fn project_doc(name: &str, link: &str, admins: &[&str], members: &[&str]) -> Value {
        json!({
            "documentKind": "project",
            "documentSelfLink": link,
            "name": name,
            "administratorGroupLinks": admins,
            "memberGroupLinks": members,
            "viewerGroupLinks": [],
            "customProperties": { "__projectIndex": "42" },
        })
    }

    // -- group_membership_query -------------------------------------------

    #[test]
    fn group_query_matches_any_role_field() {
        let query = group_membership_query(&["/g/1", "/g/2"]);
        assert!(query.matches(&project_doc("a", "/projects/a", &["/g/2"], &[])));
        assert!(query.matches(&project_doc("b", "/projects/b", &[], &["/g/1"])));
        assert!(!query.matches(&project_doc("c", "/projects/c", &["/g/3"], &["/g/4"])));
    }

    #[test]
    fn group_query_requires_project_kind() {
        let query = group_membership_query(&["/g/1"]);
        let mut doc = project_doc("a", "/projects/a", &["/g/1"], &[]);
        doc["documentKind"] = json!("cluster");
        assert!(!query.matches(&doc));
    }

    #[test]
    fn group_query_with_no_links_matches_nothing() {
        let query = group_membership_query::<&str>(&[]);
        assert!(!query.matches(&project_doc("a", "/projects/a", &["/g/1"], &["/g/2"])));
    }

    // -- name_uniqueness_query --------------------------------------------

    #[test]
    fn name_query_is_case_insensitive() {
        let query = name_uniqueness_query("ALPHA", "/projects/other");
        assert!(query.matches(&project_doc("alpha", "/projects/a", &[], &[])));
    }

    #[test]
    fn name_query_excludes_self() {
        let query = name_uniqueness_query("alpha", "/projects/a");
        assert!(!query.matches(&project_doc("alpha", "/projects/a", &[], &[])));
        assert!(query.matches(&project_doc("Alpha", "/projects/b", &[], &[])));
    }

    // -- index_lookup_query -----------------------------------------------

    #[test]
    fn index_query_matches_custom_property() {
        assert!(index_lookup_query(42).matches(&project_doc("a", "/projects/a", &[], &[])));
        assert!(!index_lookup_query(43).matches(&project_doc("a", "/projects/a", &[], &[])));
    }

    // -- project_resources_query ------------------------------------------

    #[test]
    fn resources_query_filters_by_kind_and_tenant() {
        let query = project_resources_query(PLACEMENT_KIND, "/projects/a");
        let placement = json!({"documentKind": "placement", "tenantLinks": ["/projects/a", "/tenants/t"]});
        let other_project = json!({"documentKind": "placement", "tenantLinks": ["/projects/b"]});
        let cluster = json!({"documentKind": "cluster", "tenantLinks": ["/projects/a"]});
        assert!(query.matches(&placement));
        assert!(!query.matches(&other_project));
        assert!(!query.matches(&cluster));
    }

    // -- evaluator --------------------------------------------------------

    #[test]
    fn numbers_and_bools_compare_as_text() {
        let doc = json!({"count": 3, "flag": true});
        assert!(Query::term(FieldPath::Field("count".into()), "3").matches(&doc));
        assert!(Query::term(FieldPath::Field("flag".into()), "true").matches(&doc));
    }

    #[test]
    fn missing_field_never_matches() {
        let doc = json!({});
        assert!(!Query::term(FieldPath::Field("name".into()), "").matches(&doc));
        assert!(!Query::term(FieldPath::CollectionItem("links".into()), "x").matches(&doc));
    }

    #[test]
    fn must_not_only_matches_nothing() {
        let query = Query::Boolean(vec![must_not(Query::kind("cluster"))]);
        assert!(!query.matches(&json!({"documentKind": "project"})));
    }

    #[test]
    fn project_document_is_found_by_builders() {
        let mut project = ProjectRecord::new("a", "Alpha");
        project.member_group_links.push("/g/1".into());
        project.set_project_index(7);
        let doc = project_document(&project);
        assert!(group_membership_query(&["/g/1"]).matches(&doc));
        assert!(name_uniqueness_query("alpha", "/projects/b").matches(&doc));
        assert!(index_lookup_query(7).matches(&doc));
        assert!(all_projects_query().matches(&doc));
    }

    #[test]
    fn display_renders_occurrences() {
        let rendered = name_uniqueness_query("a", "/projects/a").to_string();
        assert_eq!(
            rendered,
            "(+documentKind:\"project\" +name:\"a\"~i -documentSelfLink:\"/projects/a\"~i)"
        );
    }
}
