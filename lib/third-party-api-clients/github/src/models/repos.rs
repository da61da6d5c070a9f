use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::client::{support, Message, MAX_PER_PAGE};
use crate::models::{Label, UserId};
use crate::{Client, ClientResult, Response};

/// A file returned by the contents API. `content` is base64 and may be wrapped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Content {
    pub name: String,
    pub path: String,
    pub sha: String,
    #[serde(default)]
    pub size: u64,
    pub r#type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Tree {
    pub sha: String,
    pub tree: Vec<TreeEntry>,
    #[serde(default)]
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct TreeEntry {
    pub path: String,
    pub mode: String,
    pub r#type: String,
    pub sha: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Collaborator {
    pub login: String,
    pub id: UserId,
    /// Keyed by permission name (`admin`, `maintain`, `push`, `triage`, `pull`)
    #[serde(default)]
    pub permissions: BTreeMap<String, bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateLabel {
    pub name: String,
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

pub struct Repos {
    pub client: Client,
}

impl Repos {
    pub fn new(client: Client) -> Self {
        Repos { client }
    }

    /// Get repository content for a file path.
    ///
    /// When `reference` is `None` the repository's default branch is read.
    pub async fn get_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        reference: Option<&str>,
    ) -> ClientResult<Response<Content>> {
        let path = format!(
            "/repos/{}/{}/contents/{}",
            support::encode_path(owner),
            support::encode_path(repo),
            support::encode_path(path.trim_start_matches('/')),
        );
        let url = match reference {
            Some(reference) => self
                .client
                .url_with_query(&path, &[("ref", reference.to_string())])?,
            None => self.client.url(&path),
        };

        self.client.get(&url, Message::default()).await
    }

    /// Get a git tree by branch name or sha.
    pub async fn get_tree(
        &self,
        owner: &str,
        repo: &str,
        tree_sha: &str,
        recursive: bool,
    ) -> ClientResult<Response<Tree>> {
        let path = format!(
            "/repos/{}/{}/git/trees/{}",
            support::encode_path(owner),
            support::encode_path(repo),
            support::encode_path(tree_sha),
        );
        let url = if recursive {
            self.client
                .url_with_query(&path, &[("recursive", "1".to_string())])?
        } else {
            self.client.url(&path)
        };

        self.client.get(&url, Message::default()).await
    }

    /// List every collaborator of a repository, following pagination.
    pub async fn list_collaborators(
        &self,
        owner: &str,
        repo: &str,
    ) -> ClientResult<Response<Vec<Collaborator>>> {
        let url = self.client.url_with_query(
            &format!(
                "/repos/{}/{}/collaborators",
                support::encode_path(owner),
                support::encode_path(repo),
            ),
            &[("per_page", MAX_PER_PAGE.to_string())],
        )?;

        self.client.get_all_pages(&url).await
    }

    /// List every label of a repository, following pagination.
    pub async fn list_labels(&self, owner: &str, repo: &str) -> ClientResult<Response<Vec<Label>>> {
        let url = self.client.url_with_query(
            &format!(
                "/repos/{}/{}/labels",
                support::encode_path(owner),
                support::encode_path(repo),
            ),
            &[("per_page", MAX_PER_PAGE.to_string())],
        )?;

        self.client.get_all_pages(&url).await
    }

    pub async fn create_label(
        &self,
        owner: &str,
        repo: &str,
        label: &CreateLabel,
    ) -> ClientResult<Response<Label>> {
        let url = self.client.url(&format!(
            "/repos/{}/{}/labels",
            support::encode_path(owner),
            support::encode_path(repo),
        ));

        self.client.post(&url, Message::json(label)?).await
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::CreateLabel;
    use crate::{ClientBuilder, Credentials};

    async fn client(server: &MockServer) -> crate::Client {
        ClientBuilder::new()
            .unwrap()
            .with_host_override(&server.uri())
            .with_credentials(Credentials::Token("token".to_string()))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn get_content_sends_ref_and_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/openeuler/community/contents/sig/Kernel/OWNERS"))
            .and(query_param("ref", "master"))
            .and(header("authorization", "Bearer token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "OWNERS",
                "path": "sig/Kernel/OWNERS",
                "sha": "abc",
                "size": 12,
                "type": "file",
                "encoding": "base64",
                "content": "bWFpbnRhaW5l\ncnM6IFtd\n"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let content = client(&server)
            .await
            .repos()
            .get_content("openeuler", "community", "sig/Kernel/OWNERS", Some("master"))
            .await
            .unwrap()
            .body;

        assert_eq!("sig/Kernel/OWNERS", content.path);
        assert_eq!(Some("bWFpbnRhaW5l\ncnM6IFtd\n"), content.content.as_deref());
    }

    #[tokio::test]
    async fn missing_content_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/openeuler/community/contents/sig/Kernel/OWNERS"))
            .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"message":"Not Found"}"#))
            .mount(&server)
            .await;

        let error = client(&server)
            .await
            .repos()
            .get_content("openeuler", "community", "sig/Kernel/OWNERS", None)
            .await
            .unwrap_err();

        assert!(error.is_not_found());
    }

    #[tokio::test]
    async fn get_tree_recursively() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/openeuler/community/git/trees/master"))
            .and(query_param("recursive", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sha": "abc",
                "truncated": false,
                "tree": [
                    {"path": "sig", "mode": "040000", "type": "tree", "sha": "1"},
                    {"path": "sig/Kernel/src-openeuler/k/kernel.yaml", "mode": "100644", "type": "blob", "sha": "2", "size": 10}
                ]
            })))
            .mount(&server)
            .await;

        let tree = client(&server)
            .await
            .repos()
            .get_tree("openeuler", "community", "master", true)
            .await
            .unwrap()
            .body;

        let paths: Vec<_> = tree.tree.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(vec!["sig", "sig/Kernel/src-openeuler/k/kernel.yaml"], paths);
    }

    #[tokio::test]
    async fn list_collaborators_follows_next_links() {
        let server = MockServer::start().await;
        let next = format!(
            "<{}/repositories/1/collaborators?per_page=100&page=2>; rel=\"next\"",
            server.uri()
        );
        Mock::given(method("GET"))
            .and(path("/repos/openeuler/kernel/collaborators"))
            .and(query_param("per_page", "100"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("link", next.as_str())
                    .set_body_json(serde_json::json!([
                        {"login": "alice", "id": 1, "permissions": {"push": true, "maintain": false}}
                    ])),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repositories/1/collaborators"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"login": "bob", "id": 2, "permissions": {"push": false, "maintain": true}}
            ])))
            .mount(&server)
            .await;

        let collaborators = client(&server)
            .await
            .repos()
            .list_collaborators("openeuler", "kernel")
            .await
            .unwrap()
            .body;

        let logins: Vec<_> = collaborators.iter().map(|c| c.login.as_str()).collect();
        assert_eq!(vec!["alice", "bob"], logins);
        assert_eq!(Some(&true), collaborators[1].permissions.get("maintain"));
    }

    #[tokio::test]
    async fn create_label_posts_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/openeuler/kernel/labels"))
            .and(body_json(serde_json::json!({"name": "newcomer", "color": "ededed"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": 7, "name": "newcomer", "color": "ededed"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let label = client(&server)
            .await
            .repos()
            .create_label(
                "openeuler",
                "kernel",
                &CreateLabel {
                    name: "newcomer".to_string(),
                    color: "ededed".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap()
            .body;

        assert_eq!("newcomer", label.name);
    }
}
