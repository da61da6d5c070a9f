use std::collections::BTreeMap;
use std::error::Error;

use async_trait::async_trait;
use thiserror::Error;

/// Permissions that make a collaborator a primary contact
pub const PUSH_PERMISSIONS: [&str; 2] = ["push", "maintain"];

#[remain::sorted]
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Transport(Box<dyn Error + Send + Sync>),
}

pub type PlatformResult<T> = Result<T, PlatformError>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collaborator {
    pub login: String,
    pub permissions: BTreeMap<String, bool>,
}

impl Collaborator {
    pub fn can_push(&self) -> bool {
        PUSH_PERMISSIONS
            .iter()
            .any(|p| self.permissions.get(*p).copied().unwrap_or(false))
    }
}

/// Remote repository host queried while resolving SIGs and owners.
///
/// Implementations own transport concerns such as retries and timeouts.
#[async_trait]
pub trait GovernancePlatform: Send + Sync {
    /// Paths of a repository tree in listing order
    async fn directory_tree(
        &self,
        org: &str,
        repo: &str,
        branch: &str,
        recursive: bool,
    ) -> PlatformResult<Vec<String>>;

    async fn list_collaborators(&self, org: &str, repo: &str) -> PlatformResult<Vec<Collaborator>>;

    /// Base64 encoded file content. `branch` of `None` reads the default branch.
    async fn path_content(
        &self,
        org: &str,
        repo: &str,
        path: &str,
        branch: Option<&str>,
    ) -> PlatformResult<String>;

    async fn path_exists(
        &self,
        org: &str,
        repo: &str,
        path: &str,
        branch: Option<&str>,
    ) -> PlatformResult<bool> {
        match self.path_content(org, repo, path, branch).await {
            Ok(_) => Ok(true),
            Err(PlatformError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn pull_request_files(
        &self,
        org: &str,
        repo: &str,
        number: u64,
    ) -> PlatformResult<Vec<String>>;
}
