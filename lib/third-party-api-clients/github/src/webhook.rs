use serde::{Deserialize, Serialize};

use crate::models::issues::Issue;
use crate::models::pulls::PullRequest;
use crate::models::{Author, Repository};

/// The specific part of the payload in a webhook event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum WebhookEventPayload {
    Issues(Box<IssuesWebhookEventPayload>),
    PullRequest(Box<PullRequestWebhookEventPayload>),
    Unknown(Box<serde_json::Value>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[non_exhaustive]
pub struct WebhookEvent {
    pub sender: Option<Author>,
    pub repository: Option<Repository>,
    #[serde(skip)]
    pub kind: WebhookEventType,
    #[serde(flatten)]
    pub specific: WebhookEventPayload,
}

impl WebhookEvent {
    /// Parse a delivery from the `X-GitHub-Event` header value and the raw body.
    ///
    /// Unrecognised event kinds are kept as [`WebhookEventPayload::Unknown`].
    pub fn try_from_header_and_body<B>(header: &str, body: &B) -> Result<Self, serde_json::Error>
    where
        B: AsRef<[u8]> + ?Sized,
    {
        #[derive(Deserialize)]
        struct Intermediate {
            sender: Option<Author>,
            repository: Option<Repository>,
            #[serde(flatten)]
            specific: serde_json::Value,
        }

        let kind = WebhookEventType::from_header(header);
        let data: Intermediate = serde_json::from_slice(body.as_ref())?;
        let specific = match kind {
            WebhookEventType::Issues => {
                WebhookEventPayload::Issues(Box::new(serde_json::from_value(data.specific)?))
            }
            WebhookEventType::PullRequest => {
                WebhookEventPayload::PullRequest(Box::new(serde_json::from_value(data.specific)?))
            }
            WebhookEventType::Unknown(_) => WebhookEventPayload::Unknown(Box::new(data.specific)),
        };

        Ok(Self {
            sender: data.sender,
            repository: data.repository,
            kind,
            specific,
        })
    }
}

/// Kind of webhook event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventType {
    Issues,
    PullRequest,
    #[serde(untagged)]
    Unknown(String),
}

impl WebhookEventType {
    pub fn from_header(header: &str) -> Self {
        match header.trim() {
            "issues" => WebhookEventType::Issues,
            "pull_request" => WebhookEventType::PullRequest,
            other => WebhookEventType::Unknown(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct PullRequestWebhookEventPayload {
    pub action: PullRequestWebhookEventAction,
    pub number: u64,
    pub pull_request: PullRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum PullRequestWebhookEventAction {
    Assigned,
    AutoMergeDisabled,
    AutoMergeEnabled,
    Closed,
    ConvertedToDraft,
    Demilestoned,
    Dequeued,
    Edited,
    Enqueued,
    Labeled,
    Locked,
    Milestoned,
    Opened,
    ReadyForReview,
    Reopened,
    ReviewRequestRemoved,
    ReviewRequested,
    Synchronize,
    Unassigned,
    Unlabeled,
    Unlocked,
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct IssuesWebhookEventPayload {
    pub action: IssuesWebhookEventAction,
    pub issue: Issue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum IssuesWebhookEventAction {
    Assigned,
    Closed,
    Deleted,
    Demilestoned,
    Edited,
    Labeled,
    Locked,
    Milestoned,
    Opened,
    Pinned,
    Reopened,
    Transferred,
    Unassigned,
    Unlabeled,
    Unlocked,
    Unpinned,
    #[serde(untagged)]
    Other(String),
}
