//! In-memory [`GovernancePlatform`] for tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::platform::{Collaborator, GovernancePlatform, PlatformError, PlatformResult};

pub fn encode(raw: &str) -> String {
    STANDARD.encode(raw)
}

/// Contents are keyed by `org/repo/path` regardless of branch.
#[derive(Default)]
pub struct FakePlatform {
    tree: Mutex<Vec<String>>,
    fail_tree: bool,
    collaborators: Vec<Collaborator>,
    fail_collaborators: bool,
    contents: HashMap<String, String>,
    failing_contents: HashSet<String>,
    pull_request_files: HashMap<u64, Vec<String>>,
    tree_fetches: AtomicUsize,
    collaborator_listings: AtomicUsize,
    reads: Mutex<Vec<String>>,
}

impl FakePlatform {
    pub fn with_tree<I, S>(self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_tree(paths);
        self
    }

    pub fn set_tree<I, S>(&self, paths: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.tree.lock().unwrap() = paths.into_iter().map(Into::into).collect();
    }

    pub fn failing_tree(mut self) -> Self {
        self.fail_tree = true;
        self
    }

    pub fn with_collaborator(mut self, login: &str, permissions: &[(&str, bool)]) -> Self {
        self.collaborators.push(Collaborator {
            login: login.to_string(),
            permissions: permissions
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<BTreeMap<_, _>>(),
        });
        self
    }

    pub fn failing_collaborators(mut self) -> Self {
        self.fail_collaborators = true;
        self
    }

    /// Stores `raw` base64 encoded, the way the content API returns it
    pub fn with_content(self, org: &str, repo: &str, path: &str, raw: &str) -> Self {
        self.with_raw_content(org, repo, path, &encode(raw))
    }

    pub fn with_raw_content(mut self, org: &str, repo: &str, path: &str, content: &str) -> Self {
        self.contents
            .insert(format!("{org}/{repo}/{path}"), content.to_string());
        self
    }

    pub fn failing_content(mut self, key: &str) -> Self {
        self.failing_contents.insert(key.to_string());
        self
    }

    pub fn with_pull_request_files(mut self, number: u64, files: &[&str]) -> Self {
        self.pull_request_files
            .insert(number, files.iter().map(|f| f.to_string()).collect());
        self
    }

    pub fn tree_fetches(&self) -> usize {
        self.tree_fetches.load(Ordering::SeqCst)
    }

    pub fn collaborator_listings(&self) -> usize {
        self.collaborator_listings.load(Ordering::SeqCst)
    }

    pub fn was_read(&self, key: &str) -> bool {
        self.reads.lock().unwrap().iter().any(|r| r == key)
    }
}

fn transport(message: String) -> PlatformError {
    PlatformError::Transport(message.into())
}

#[async_trait]
impl GovernancePlatform for FakePlatform {
    async fn directory_tree(
        &self,
        org: &str,
        repo: &str,
        _branch: &str,
        _recursive: bool,
    ) -> PlatformResult<Vec<String>> {
        self.tree_fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_tree {
            return Err(transport(format!("tree of {org}/{repo} unavailable")));
        }

        Ok(self.tree.lock().unwrap().clone())
    }

    async fn list_collaborators(&self, org: &str, repo: &str) -> PlatformResult<Vec<Collaborator>> {
        self.collaborator_listings.fetch_add(1, Ordering::SeqCst);
        if self.fail_collaborators {
            return Err(transport(format!("collaborators of {org}/{repo} unavailable")));
        }

        Ok(self.collaborators.clone())
    }

    async fn path_content(
        &self,
        org: &str,
        repo: &str,
        path: &str,
        _branch: Option<&str>,
    ) -> PlatformResult<String> {
        let key = format!("{org}/{repo}/{path}");
        self.reads.lock().unwrap().push(key.clone());

        if self.failing_contents.contains(&key) {
            return Err(transport(format!("{key} unavailable")));
        }

        self.contents
            .get(&key)
            .cloned()
            .ok_or(PlatformError::NotFound(key))
    }

    async fn pull_request_files(
        &self,
        org: &str,
        repo: &str,
        number: u64,
    ) -> PlatformResult<Vec<String>> {
        self.pull_request_files
            .get(&number)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("{org}/{repo}#{number}")))
    }
}
