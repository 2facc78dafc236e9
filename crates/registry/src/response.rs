//! Decoding of registry repository listings.

use serde::Deserialize;

/// One repository in a registry project.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepositoryEntry {
    /// Repository name, usually `<project>/<image>`.
    pub name: String,
    /// Number of tags pushed to the repository.
    #[serde(default)]
    pub tags_count: u64,
}

/// Field the raw array is wrapped under before decoding.
const FIELD_NAME_RESPONSE_ENTRIES: &str = "responseEntries";

#[derive(Debug, Deserialize)]
struct RepositoriesResponse {
    #[serde(rename = "responseEntries", default)]
    response_entries: Option<Vec<RepositoryEntry>>,
}

/// Decode a raw repository listing.
///
/// The body is a bare array; it is wrapped into a single-field object and
/// decoded as a whole so repository names containing `/` or other special
/// characters never reach a per-entry parse. A blank or `null` body is an
/// empty listing.
pub fn parse_repositories(raw: &str) -> Result<Vec<RepositoryEntry>, serde_json::Error> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    let wrapped = format!("{{\"{FIELD_NAME_RESPONSE_ENTRIES}\": {raw}}}");
    let response: RepositoriesResponse = serde_json::from_str(&wrapped)?;
    Ok(response.response_entries.unwrap_or_default())
}
