use std::sync::Arc;

use indexmap::IndexSet;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::documents::{self, DocumentError, OwnershipRule, SigInfoDocument};
use crate::platform::{GovernancePlatform, PlatformError};
use crate::sigs::GovernanceRepo;

pub const SIG_INFO_FILE: &str = "sig-info.yaml";
pub const OWNERS_FILE: &str = "OWNERS";

#[remain::sorted]
#[derive(Debug, Error)]
pub enum OwnershipError {
    #[error("unable to list collaborators of {org}/{repo}: {source}")]
    Collaborators {
        org: String,
        repo: String,
        #[source]
        source: PlatformError,
    },

    #[error("unable to parse {path}: {source}")]
    Document {
        path: String,
        #[source]
        source: DocumentError,
    },

    #[error("unable to read {path}: {source}")]
    Fetch {
        path: String,
        #[source]
        source: PlatformError,
    },
}

pub type OwnershipResult<T> = Result<T, OwnershipError>;

/// Location of the ownership relations document used for path attribution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRules {
    pub path: String,
    /// `None` reads the repository's default branch
    pub branch: Option<String>,
}

/// Where and how to look for the people accountable for a SIG's repositories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipPolicy {
    pub governance: GovernanceRepo,
    /// Enables path attribution for pull requests
    pub path_rules: Option<PathRules>,
    pub sig_info_file: String,
    /// Legacy marker, when present under the SIG directory the SIG information document is not read
    pub owners_file: String,
}

impl OwnershipPolicy {
    pub fn new(governance: GovernanceRepo) -> Self {
        Self {
            governance,
            path_rules: None,
            sig_info_file: SIG_INFO_FILE.to_string(),
            owners_file: OWNERS_FILE.to_string(),
        }
    }

    pub fn with_path_rules(mut self, path_rules: PathRules) -> Self {
        self.path_rules = Some(path_rules);
        self
    }

    pub fn sig_file(&self, sig: &str, file_name: &str) -> String {
        format!("sig/{sig}/{file_name}")
    }
}

/// Contacts for a welcome message.
///
/// `primary` holds maintainers or collaborators with push access, `secondary` holds committers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedOwners {
    pub primary: Vec<String>,
    pub secondary: Vec<String>,
}

impl ResolvedOwners {
    pub fn primary_only(primary: Vec<String>) -> Self {
        Self {
            primary,
            secondary: Vec::new(),
        }
    }

    pub fn is_unattributed(&self) -> bool {
        self.primary.is_empty() && self.secondary.is_empty()
    }
}

/// Committers who are also maintainers are only listed once, as maintainers.
impl From<SigInfoDocument> for ResolvedOwners {
    fn from(document: SigInfoDocument) -> Self {
        let secondary = document
            .committers
            .into_iter()
            .filter(|committer| !document.maintainers.contains(&committer.to_lowercase()))
            .collect();

        Self {
            primary: document.maintainers.into_iter().collect(),
            secondary,
        }
    }
}

#[derive(Debug)]
pub struct OwnerResolution {
    pub owners: ResolvedOwners,
    /// Set when the SIG information fallback failed and `owners` holds the collaborator scan
    pub fallback_error: Option<OwnershipError>,
}

impl OwnerResolution {
    fn resolved(owners: ResolvedOwners) -> Self {
        Self {
            owners,
            fallback_error: None,
        }
    }
}

/// Union of the owners of every rule matching any of the changed files, in first seen order
pub fn match_owners<S: AsRef<str>>(changed_files: &[S], rules: &[OwnershipRule]) -> IndexSet<String> {
    let mut owners = IndexSet::new();
    for file in changed_files {
        for rule in rules.iter().filter(|r| r.matches(file.as_ref())) {
            owners.extend(rule.owners.iter().cloned());
        }
    }

    owners
}

/// Resolves who to point a newcomer at, in order:
///
/// 1. owners of the ownership rules matching the changed files, when path attribution is enabled.
///    A non-empty result is final.
/// 2. collaborators holding push or maintain permission.
/// 3. maintainers and committers from the SIG information document, unless the SIG still carries
///    the legacy OWNERS marker. When read, the document supersedes the collaborator scan.
pub struct OwnershipResolver {
    platform: Arc<dyn GovernancePlatform>,
}

impl OwnershipResolver {
    pub fn new(platform: Arc<dyn GovernancePlatform>) -> Self {
        Self { platform }
    }

    #[instrument(skip(self, changed_files, policy), fields(changed_files = changed_files.len()))]
    pub async fn resolve_owners(
        &self,
        org: &str,
        repo: &str,
        sig: &str,
        changed_files: &[String],
        policy: &OwnershipPolicy,
    ) -> OwnershipResult<OwnerResolution> {
        if let Some(path_rules) = &policy.path_rules {
            if !changed_files.is_empty() {
                match self.path_owners(org, repo, changed_files, path_rules).await {
                    Ok(owners) if !owners.is_empty() => {
                        return Ok(OwnerResolution::resolved(ResolvedOwners::primary_only(
                            owners.into_iter().collect(),
                        )));
                    }
                    Ok(_) => debug!("no ownership rule matched the changed files"),
                    Err(e) => warn!("path attribution failed, falling back to collaborators: {e}"),
                }
            }
        }

        let collaborators = self.collaborator_owners(org, repo).await?;

        Ok(match self.sig_document_owners(sig, policy).await {
            Ok(Some(document_owners)) => supersede_with_document(collaborators, document_owners),
            Ok(None) => OwnerResolution::resolved(ResolvedOwners::primary_only(collaborators)),
            Err(e) => OwnerResolution {
                owners: ResolvedOwners::primary_only(collaborators),
                fallback_error: Some(e),
            },
        })
    }

    pub async fn path_owners(
        &self,
        org: &str,
        repo: &str,
        changed_files: &[String],
        path_rules: &PathRules,
    ) -> OwnershipResult<IndexSet<String>> {
        let content = self
            .platform
            .path_content(org, repo, &path_rules.path, path_rules.branch.as_deref())
            .await
            .map_err(|source| OwnershipError::Fetch {
                path: format!("{org}/{repo}/{}", path_rules.path),
                source,
            })?;

        let rules =
            documents::parse_relations(&content).map_err(|source| OwnershipError::Document {
                path: format!("{org}/{repo}/{}", path_rules.path),
                source,
            })?;

        Ok(match_owners(changed_files, &rules))
    }

    /// Logins of collaborators with push or maintain permission in listing order
    pub async fn collaborator_owners(&self, org: &str, repo: &str) -> OwnershipResult<Vec<String>> {
        let collaborators = self
            .platform
            .list_collaborators(org, repo)
            .await
            .map_err(|source| OwnershipError::Collaborators {
                org: org.to_string(),
                repo: repo.to_string(),
                source,
            })?;

        Ok(collaborators
            .into_iter()
            .filter(|c| c.can_push())
            .map(|c| c.login)
            .collect())
    }

    /// `None` when the SIG directory carries the legacy OWNERS marker
    async fn sig_document_owners(
        &self,
        sig: &str,
        policy: &OwnershipPolicy,
    ) -> OwnershipResult<Option<ResolvedOwners>> {
        let governance = &policy.governance;

        let marker = policy.sig_file(sig, &policy.owners_file);
        let has_marker = self
            .platform
            .path_exists(&governance.org, &governance.repo, &marker, Some(&governance.branch))
            .await
            .map_err(|source| OwnershipError::Fetch {
                path: marker.clone(),
                source,
            })?;
        if has_marker {
            debug!("{marker} present, skipping sig information document");
            return Ok(None);
        }

        let sig_info = policy.sig_file(sig, &policy.sig_info_file);
        let content = self
            .platform
            .path_content(&governance.org, &governance.repo, &sig_info, Some(&governance.branch))
            .await
            .map_err(|source| OwnershipError::Fetch {
                path: sig_info.clone(),
                source,
            })?;

        let document = SigInfoDocument::parse(&content).map_err(|source| OwnershipError::Document {
            path: sig_info,
            source,
        })?;

        Ok(Some(ResolvedOwners::from(document)))
    }
}

/// Once the SIG information document has been read it replaces the collaborator scan outright,
/// even when it names nobody.
fn supersede_with_document(collaborators: Vec<String>, document: ResolvedOwners) -> OwnerResolution {
    debug!(
        "sig information document supersedes {} collaborator(s)",
        collaborators.len()
    );
    OwnerResolution::resolved(document)
}
