use async_trait::async_trait;
use github_client::models::repos::CreateLabel;
use github_client::{Client, ClientBuilder, ClientError, Credentials};
use sig_ownership::{Collaborator, GovernancePlatform, PlatformError, PlatformResult};
use tracing::warn;

use crate::configuration::GithubConfiguration;
use crate::errors::WelcomeResult;

const LABEL_COLOR: &str = "ededed";

/// Posting side of the bot: comments and labels on issues and pull requests.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn create_comment(&self, org: &str, repo: &str, number: u64, body: &str) -> PlatformResult<()>;

    async fn add_labels(&self, org: &str, repo: &str, number: u64, labels: &[String]) -> PlatformResult<()>;

    async fn repository_labels(&self, org: &str, repo: &str) -> PlatformResult<Vec<String>>;

    async fn create_repository_label(&self, org: &str, repo: &str, label: &str) -> PlatformResult<()>;
}

pub struct GithubPlatform {
    client: Client,
}

impl GithubPlatform {
    pub fn new(configuration: &GithubConfiguration) -> WelcomeResult<Self> {
        let mut builder = ClientBuilder::new()?
            .with_tracing()
            .with_retry()
            .with_credentials(Credentials::Token(configuration.token.clone()));
        if let Some(host) = &configuration.host {
            builder = builder.with_host_override(host);
        }

        Ok(Self::from_client(builder.build()?))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn platform_error(resource: String, error: ClientError) -> PlatformError {
    if error.is_not_found() {
        PlatformError::NotFound(resource)
    } else {
        PlatformError::Transport(Box::new(error))
    }
}

#[async_trait]
impl GovernancePlatform for GithubPlatform {
    async fn directory_tree(
        &self,
        org: &str,
        repo: &str,
        branch: &str,
        recursive: bool,
    ) -> PlatformResult<Vec<String>> {
        let tree = self
            .client
            .repos()
            .get_tree(org, repo, branch, recursive)
            .await
            .map_err(|e| platform_error(format!("{org}/{repo}@{branch}"), e))?
            .body;

        if tree.truncated {
            warn!("tree of {org}/{repo}@{branch} was truncated, sig lookup may be incomplete");
        }

        Ok(tree
            .tree
            .into_iter()
            .filter(|entry| entry.r#type == "blob")
            .map(|entry| entry.path)
            .collect())
    }

    async fn list_collaborators(&self, org: &str, repo: &str) -> PlatformResult<Vec<Collaborator>> {
        let collaborators = self
            .client
            .repos()
            .list_collaborators(org, repo)
            .await
            .map_err(|e| platform_error(format!("{org}/{repo}"), e))?
            .body;

        Ok(collaborators
            .into_iter()
            .map(|c| Collaborator {
                login: c.login,
                permissions: c.permissions,
            })
            .collect())
    }

    async fn path_content(
        &self,
        org: &str,
        repo: &str,
        path: &str,
        branch: Option<&str>,
    ) -> PlatformResult<String> {
        let resource = format!("{org}/{repo}/{path}");
        let content = self
            .client
            .repos()
            .get_content(org, repo, path, branch)
            .await
            .map_err(|e| platform_error(resource.clone(), e))?
            .body;

        content.content.ok_or_else(|| {
            PlatformError::Transport(format!("{resource} has no inline content").into())
        })
    }

    async fn pull_request_files(
        &self,
        org: &str,
        repo: &str,
        number: u64,
    ) -> PlatformResult<Vec<String>> {
        let files = self
            .client
            .pull_requests()
            .list_files(org, repo, number)
            .await
            .map_err(|e| platform_error(format!("{org}/{repo}#{number}"), e))?
            .body;

        Ok(files.into_iter().map(|f| f.filename).collect())
    }
}

#[async_trait]
impl Messenger for GithubPlatform {
    async fn create_comment(&self, org: &str, repo: &str, number: u64, body: &str) -> PlatformResult<()> {
        self.client
            .issues()
            .create_comment(org, repo, number, body)
            .await
            .map_err(|e| platform_error(format!("{org}/{repo}#{number}"), e))?;
        Ok(())
    }

    async fn add_labels(&self, org: &str, repo: &str, number: u64, labels: &[String]) -> PlatformResult<()> {
        self.client
            .issues()
            .add_labels(org, repo, number, labels)
            .await
            .map_err(|e| platform_error(format!("{org}/{repo}#{number}"), e))?;
        Ok(())
    }

    async fn repository_labels(&self, org: &str, repo: &str) -> PlatformResult<Vec<String>> {
        let labels = self
            .client
            .repos()
            .list_labels(org, repo)
            .await
            .map_err(|e| platform_error(format!("{org}/{repo}"), e))?
            .body;

        Ok(labels.into_iter().map(|l| l.name).collect())
    }

    async fn create_repository_label(&self, org: &str, repo: &str, label: &str) -> PlatformResult<()> {
        self.client
            .repos()
            .create_label(
                org,
                repo,
                &CreateLabel {
                    name: label.to_string(),
                    color: LABEL_COLOR.to_string(),
                    description: None,
                },
            )
            .await
            .map_err(|e| platform_error(format!("{org}/{repo}"), e))?;
        Ok(())
    }
}
