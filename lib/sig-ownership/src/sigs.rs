//! Repository to SIG resolution.
//!
//! The community repository encodes which SIG owns a repository as a file path of the form
//! `sig/<sig-name>/<org>/<bucket>/<repo>.yaml`. A [`SigCache`] keeps an index of those paths for
//! one governance repository and rebuilds it wholesale whenever a lookup misses.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::platform::{GovernancePlatform, PlatformError};

const GOVERNANCE_ROOT: &str = "sig";
const GOVERNANCE_PATH_SEGMENTS: usize = 5;
const GOVERNANCE_FILE_SUFFIX: &str = ".yaml";

#[remain::sorted]
#[derive(Debug, Error)]
pub enum SigError {
    #[error("`{0}` is not a governance path of the form sig/<sig>/<org>/<bucket>/<repo>.yaml")]
    MalformedPath(String),

    #[error("unable to fetch governance tree {governance}: {source}")]
    TreeFetch {
        governance: GovernanceRepo,
        #[source]
        source: PlatformError,
    },
}

pub type SigResult<T> = Result<T, SigError>;

/// The repository, and branch, holding the governance tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GovernanceRepo {
    pub org: String,
    pub repo: String,
    pub branch: String,
}

impl GovernanceRepo {
    pub fn new<O: Into<String>, R: Into<String>, B: Into<String>>(org: O, repo: R, branch: B) -> Self {
        Self {
            org: org.into(),
            repo: repo.into(),
            branch: branch.into(),
        }
    }
}

impl fmt::Display for GovernanceRepo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.org, self.repo, self.branch)
    }
}

/// One path of a directory tree listing along with its depth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GovernanceTreeEntry<'a> {
    pub path: &'a str,
    pub depth: usize,
}

impl<'a> GovernanceTreeEntry<'a> {
    pub fn new(path: &'a str) -> Self {
        Self {
            path,
            depth: path.matches('/').count(),
        }
    }

    pub fn is_governance_depth(&self) -> bool {
        self.depth == GOVERNANCE_PATH_SEGMENTS - 1
    }
}

/// A governance path split into the parts used for SIG lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GovernancePath {
    pub sig: String,
    pub org: String,
    pub repo: String,
}

impl GovernancePath {
    pub fn parse(path: &str) -> SigResult<Self> {
        let malformed = || SigError::MalformedPath(path.to_string());

        let segments: Vec<&str> = path.split('/').collect();
        if segments.len() != GOVERNANCE_PATH_SEGMENTS || segments.iter().any(|s| s.is_empty()) {
            return Err(malformed());
        }

        if segments[0] != GOVERNANCE_ROOT {
            return Err(malformed());
        }

        let repo = segments[4]
            .strip_suffix(GOVERNANCE_FILE_SUFFIX)
            .filter(|r| !r.is_empty())
            .ok_or_else(malformed)?;

        Ok(Self {
            sig: segments[1].to_string(),
            org: segments[2].to_string(),
            repo: repo.to_string(),
        })
    }

    pub fn is_for(&self, org: &str, repo: &str) -> bool {
        self.org == org && self.repo == repo
    }
}

/// Governance paths mapped to the SIG they belong to.
///
/// Entries are kept ordered by path so when several paths claim the same repository the
/// lexicographically smallest one wins.
#[derive(Debug, Clone, Default)]
pub struct SigIndex {
    entries: BTreeMap<String, GovernancePath>,
}

impl SigIndex {
    pub fn build<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut entries = BTreeMap::new();
        for path in paths {
            let entry = GovernanceTreeEntry::new(path.as_ref());
            if !entry.is_governance_depth() {
                continue;
            }

            match GovernancePath::parse(entry.path) {
                Ok(governance_path) => {
                    entries.insert(entry.path.to_string(), governance_path);
                }
                Err(e) => debug!("skipping tree entry: {e}"),
            }
        }

        let index = Self { entries };
        index.warn_duplicates();
        index
    }

    pub fn find(&self, org: &str, repo: &str) -> Option<&str> {
        self.entries
            .values()
            .find(|p| p.is_for(org, repo))
            .map(|p| p.sig.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn warn_duplicates(&self) {
        let mut seen = HashSet::new();
        for (path, governance_path) in &self.entries {
            if !seen.insert((&governance_path.org, &governance_path.repo)) {
                warn!(
                    "{path} claims {}/{} which an earlier governance path already maps; the earlier path wins",
                    governance_path.org, governance_path.repo
                );
            }
        }
    }
}

#[derive(Debug, Default)]
struct CacheState {
    index: Option<SigIndex>,
    // bumped on every rebuild so waiters can tell a refresh happened while they queued
    generation: u64,
}

impl CacheState {
    fn find(&self, org: &str, repo: &str) -> Option<String> {
        self.index
            .as_ref()
            .and_then(|i| i.find(org, repo))
            .map(str::to_string)
    }
}

/// SIG index for a single governance repository.
///
/// Lookups share a read lock. Rebuilds hold the write lock so at most one tree fetch is in
/// flight and no reader sees a partially built index.
pub struct SigCache {
    governance: GovernanceRepo,
    platform: Arc<dyn GovernancePlatform>,
    state: RwLock<CacheState>,
}

impl SigCache {
    pub fn new(governance: GovernanceRepo, platform: Arc<dyn GovernancePlatform>) -> Self {
        Self {
            governance,
            platform,
            state: RwLock::new(CacheState::default()),
        }
    }

    pub fn governance(&self) -> &GovernanceRepo {
        &self.governance
    }

    /// Returns the SIG owning `org/repo`, or an empty string when the governance tree has no entry
    /// for it even after a refresh.
    pub async fn resolve(&self, org: &str, repo: &str) -> SigResult<String> {
        let observed = {
            let state = self.state.read().await;
            if let Some(sig) = state.find(org, repo) {
                debug!("sig cache hit for {org}/{repo}: {sig}");
                return Ok(sig);
            }
            state.generation
        };

        let mut state = self.state.write().await;
        if state.generation == observed {
            if state.index.is_none() {
                self.rebuild(&mut state).await?;
                if let Some(sig) = state.find(org, repo) {
                    return Ok(sig);
                }
            }

            // the index may be stale, refresh once before giving up
            self.rebuild(&mut state).await?;
        }

        Ok(state.find(org, repo).unwrap_or_default())
    }

    async fn rebuild(&self, state: &mut CacheState) -> SigResult<()> {
        let governance = &self.governance;
        let paths = self
            .platform
            .directory_tree(&governance.org, &governance.repo, &governance.branch, true)
            .await
            .map_err(|source| SigError::TreeFetch {
                governance: governance.clone(),
                source,
            })?;

        let index = SigIndex::build(&paths);
        info!(
            "rebuilt sig index for {governance} from {} tree entries, {} governance paths",
            paths.len(),
            index.len()
        );

        state.index = if index.is_empty() { None } else { Some(index) };
        state.generation += 1;

        Ok(())
    }
}

/// Answers which SIG owns a repository, keeping one [`SigCache`] per governance repository.
pub struct SigResolver {
    platform: Arc<dyn GovernancePlatform>,
    caches: Mutex<HashMap<GovernanceRepo, Arc<SigCache>>>,
}

impl SigResolver {
    pub fn new(platform: Arc<dyn GovernancePlatform>) -> Self {
        Self {
            platform,
            caches: Mutex::new(HashMap::new()),
        }
    }

    pub fn cache_for(&self, governance: &GovernanceRepo) -> Arc<SigCache> {
        let mut caches = self.caches.lock().unwrap_or_else(PoisonError::into_inner);
        caches
            .entry(governance.clone())
            .or_insert_with(|| {
                Arc::new(SigCache::new(governance.clone(), Arc::clone(&self.platform)))
            })
            .clone()
    }

    #[instrument(skip(self, governance), fields(governance = %governance))]
    pub async fn resolve_sig(
        &self,
        org: &str,
        repo: &str,
        governance: &GovernanceRepo,
    ) -> SigResult<String> {
        self.cache_for(governance).resolve(org, repo).await
    }
}
