//! Bounded collaborator calls.

use std::future::Future;
use std::time::Duration;

use roster_db::RepoError;

/// Await `call`, failing with [`RepoError::Timeout`] once `after` elapses.
pub async fn bounded<T, F>(operation: &'static str, after: Duration, call: F) -> Result<T, RepoError>
where
    F: Future<Output = Result<T, RepoError>>,
{
    match tokio::time::timeout(after, call).await {
        Ok(result) => result,
        Err(_) => Err(RepoError::Timeout { operation, after }),
    }
}
