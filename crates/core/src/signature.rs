//! Canonical project signatures.
//!
//! A signature is the SHA-256 of a length-prefixed encoding of every stored
//! field in a fixed order. Custom properties are encoded in key order, so
//! the same logical state always yields the same signature no matter how the
//! map was built.

use sha2::{Digest, Sha256};

use crate::project::ProjectRecord;
use crate::roles::Role;

/// Compute the hex signature of a project record.
pub fn compute_signature(project: &ProjectRecord) -> String {
    let mut hasher = Sha256::new();

    put_str(&mut hasher, b"id", &project.id);
    put_str(&mut hasher, b"name", &project.name);
    match &project.description {
        Some(description) => put_str(&mut hasher, b"description", description),
        None => hasher.update(b"description:none"),
    }
    hasher.update(if project.is_public { b"public:1" } else { b"public:0" });

    for role in Role::ALL {
        let links = project.group_links(role);
        hasher.update(role.as_str().as_bytes());
        hasher.update((links.len() as u64).to_be_bytes());
        for link in links {
            put_str(&mut hasher, b"link", link);
        }
    }

    hasher.update((project.custom_properties.len() as u64).to_be_bytes());
    for (key, value) in &project.custom_properties {
        put_str(&mut hasher, b"key", key);
        put_str(&mut hasher, b"value", value);
    }

    format!("{:x}", hasher.finalize())
}

fn put_str(hasher: &mut Sha256, tag: &[u8], value: &str) {
    hasher.update(tag);
    hasher.update((value.len() as u64).to_be_bytes());
    hasher.update(value.as_bytes());
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn sample() -> ProjectRecord {
        let mut project = ProjectRecord::new("p1", "Alpha");
        project.description = Some("first".into());
        project.custom_properties.insert("a".into(), "1".into());
        project.custom_properties.insert("b".into(), "2".into());
        project
    }

    #[test]
    fn signature_is_stable() {
        assert_eq!(compute_signature(&sample()), compute_signature(&sample()));
        assert_eq!(compute_signature(&sample()).len(), 64);
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let mut forward = ProjectRecord::new("p1", "Alpha");
        let mut reverse = ProjectRecord::new("p1", "Alpha");
        let mut props = BTreeMap::new();
        props.insert("z".to_string(), "1".to_string());
        props.insert("a".to_string(), "2".to_string());
        forward.custom_properties = props;
        reverse.custom_properties.insert("a".into(), "2".into());
        reverse.custom_properties.insert("z".into(), "1".into());
        assert_eq!(compute_signature(&forward), compute_signature(&reverse));
    }

    #[test]
    fn every_field_affects_the_signature() {
        let base = compute_signature(&sample());

        let mut changed = sample();
        changed.name = "Beta".into();
        assert_ne!(compute_signature(&changed), base);

        let mut changed = sample();
        changed.description = None;
        assert_ne!(compute_signature(&changed), base);

        let mut changed = sample();
        changed.is_public = true;
        assert_ne!(compute_signature(&changed), base);

        let mut changed = sample();
        changed.viewer_group_links.push("/core/authz/user-groups/g".into());
        assert_ne!(compute_signature(&changed), base);

        let mut changed = sample();
        changed.custom_properties.insert("b".into(), "3".into());
        assert_ne!(compute_signature(&changed), base);
    }

    #[test]
    fn adjacent_fields_do_not_alias() {
        let mut left = ProjectRecord::new("p1", "ab");
        left.description = Some("c".into());
        let mut right = ProjectRecord::new("p1", "a");
        right.description = Some("bc".into());
        assert_ne!(compute_signature(&left), compute_signature(&right));
    }

    #[test]
    fn link_moved_between_roles_changes_signature() {
        let mut admins = ProjectRecord::new("p1", "Alpha");
        admins.administrator_group_links.push("/g".into());
        let mut members = ProjectRecord::new("p1", "Alpha");
        members.member_group_links.push("/g".into());
        assert_ne!(compute_signature(&admins), compute_signature(&members));
    }
}
