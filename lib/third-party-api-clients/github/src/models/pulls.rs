use serde::{Deserialize, Serialize};
use url::Url;

use crate::client::{support, MAX_PER_PAGE};
use crate::models::{Author, AuthorAssociation, IssueState, Label, PullRequestId};
use crate::{Client, ClientResult, Response};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct PullRequest {
    pub id: PullRequestId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_url: Option<Url>,
    /// The pull request number.  Note that GitHub's REST API
    /// considers every pull-request an issue with the same number.
    pub number: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<IssueState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Box<Author>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<Label>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_association: Option<AuthorAssociation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed_files: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct PullRequestFile {
    pub sha: String,
    pub filename: String,
    pub status: FileStatus,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default)]
    pub changes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum FileStatus {
    Added,
    Changed,
    Copied,
    Modified,
    Removed,
    Renamed,
    Unchanged,
    #[serde(untagged)]
    Other(String),
}

pub struct PullRequests {
    pub client: Client,
}

impl PullRequests {
    pub fn new(client: Client) -> Self {
        PullRequests { client }
    }

    /// List the files changed by a pull request, following pagination.
    pub async fn list_files(
        &self,
        owner: &str,
        repo: &str,
        pull_number: u64,
    ) -> ClientResult<Response<Vec<PullRequestFile>>> {
        let url = self.client.url_with_query(
            &format!(
                "/repos/{}/{}/pulls/{}/files",
                support::encode_path(owner),
                support::encode_path(repo),
                pull_number,
            ),
            &[("per_page", MAX_PER_PAGE.to_string())],
        )?;

        self.client.get_all_pages(&url).await
    }
}
