/// Document links are absolute service paths, e.g. `/projects/alpha`.
pub type Link = String;

/// External project indexes are drawn from an unsigned 32-bit range but
/// carried as `u64` so arithmetic on the bound never overflows.
pub type ProjectIndex = u64;

/// Return the last path segment of a link (the document id).
///
/// `/core/authz/user-groups/alpha_project-admins` -> `alpha_project-admins`.
/// A link without separators is returned unchanged.
pub fn link_id(link: &str) -> &str {
    link.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(link)
}
