use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;
use serde::Deserialize;

use crate::errors::WelcomeResult;

pub const NEWCOMER_LABEL: &str = "newcomer";

/// Count of pull requests an author has opened across the community.
#[async_trait]
pub trait NewcomerStatistics: Send + Sync {
    async fn pull_request_total(&self, endpoint: &str, author: &str) -> WelcomeResult<u64>;
}

#[derive(Debug, Deserialize)]
struct PullRequestTotal {
    #[serde(default)]
    total: u64,
}

pub struct HttpNewcomerStatistics {
    client: ClientWithMiddleware,
}

impl HttpNewcomerStatistics {
    pub fn new() -> WelcomeResult<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            client: ClientBuilder::new(http)
                .with(TracingMiddleware::default())
                .build(),
        })
    }
}

#[async_trait]
impl NewcomerStatistics for HttpNewcomerStatistics {
    async fn pull_request_total(&self, endpoint: &str, author: &str) -> WelcomeResult<u64> {
        let response = self
            .client
            .get(endpoint)
            .query(&[("author", author)])
            .send()
            .await?
            .error_for_status()?;

        let body: PullRequestTotal = response.json().await?;
        Ok(body.total)
    }
}
