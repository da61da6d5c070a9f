use serde::{Deserialize, Serialize};
use url::Url;

use crate::client::{support, Message};
use crate::models::{Author, AuthorAssociation, CommentId, IssueId, IssueState, Label};
use crate::{Client, ClientResult, Response};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Issue {
    pub id: IssueId,
    pub number: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_url: Option<Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<IssueState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Box<Author>>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_association: Option<AuthorAssociation>,
    /// Present when the issue is a pull request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Comment {
    pub id: CommentId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_url: Option<Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Author>,
}

#[derive(Serialize)]
struct CommentBody<'a> {
    body: &'a str,
}

#[derive(Serialize)]
struct LabelsBody<'a> {
    labels: &'a [String],
}

pub struct Issues {
    pub client: Client,
}

impl Issues {
    pub fn new(client: Client) -> Self {
        Issues { client }
    }

    /// Comment on an issue or pull request.
    pub async fn create_comment(
        &self,
        owner: &str,
        repo: &str,
        issue_number: u64,
        body: &str,
    ) -> ClientResult<Response<Comment>> {
        let url = self.client.url(&format!(
            "/repos/{}/{}/issues/{}/comments",
            support::encode_path(owner),
            support::encode_path(repo),
            issue_number,
        ));

        self.client
            .post(&url, Message::json(&CommentBody { body })?)
            .await
    }

    /// Add labels to an issue or pull request. Returns every label now on it.
    pub async fn add_labels(
        &self,
        owner: &str,
        repo: &str,
        issue_number: u64,
        labels: &[String],
    ) -> ClientResult<Response<Vec<Label>>> {
        let url = self.client.url(&format!(
            "/repos/{}/{}/issues/{}/labels",
            support::encode_path(owner),
            support::encode_path(repo),
            issue_number,
        ));

        self.client
            .post(&url, Message::json(&LabelsBody { labels })?)
            .await
    }
}
