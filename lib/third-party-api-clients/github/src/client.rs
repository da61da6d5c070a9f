use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use reqwest_middleware::Middleware;
use reqwest_retry::RetryTransientMiddleware;
use reqwest_tracing::TracingMiddleware;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::models::{issues, pulls, repos};

const DEFAULT_HOST: &str = "https://api.github.com";
const DEFAULT_CLIENT_AGENT: &str = "sig-welcome-github";
const GITHUB_API_VERSION: &str = "2022-11-28";
const GITHUB_API_VERSION_HEADER: &str = "X-GitHub-Api-Version";

/// Largest page size the REST API accepts
pub const MAX_PER_PAGE: u64 = 100;

pub(crate) mod support {
    use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

    const PATH_SET: &AsciiSet = &CONTROLS
        .add(b' ')
        .add(b'"')
        .add(b'#')
        .add(b'<')
        .add(b'>')
        .add(b'?')
        .add(b'`')
        .add(b'{')
        .add(b'}');

    pub(crate) fn encode_path(pc: &str) -> String {
        utf8_percent_encode(pc, PATH_SET).to_string()
    }
}

#[derive(Debug)]
pub struct Response<T> {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: T,
}

impl<T> Response<T> {
    pub fn new(status: StatusCode, headers: HeaderMap, body: T) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }
}

/// Errors returned by the client
#[derive(Debug, Error)]
pub enum ClientError {
    /// Generic HTTP Error
    #[error("HTTP Error. Code: {status}, message: {error}")]
    HttpError {
        status: StatusCode,
        headers: HeaderMap,
        error: String,
    },

    /// Errors returned by reqwest
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    /// Errors returned by reqwest middleware
    #[error(transparent)]
    ReqwestMiddleWareError(#[from] reqwest_middleware::Error),

    /// Serde JSON parsing error
    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),

    /// URL Parsing Error
    #[error(transparent)]
    UrlParserError(#[from] url::ParseError),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::HttpError { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Default)]
pub(crate) struct Message {
    pub body: Option<reqwest::Body>,
    pub content_type: Option<String>,
}

impl Message {
    pub(crate) fn json<T: serde::Serialize>(body: &T) -> ClientResult<Self> {
        Ok(Self {
            body: Some(reqwest::Body::from(serde_json::to_vec(body)?)),
            content_type: Some(mime::APPLICATION_JSON.to_string()),
        })
    }
}

/// Entrypoint for interacting with the API client.
#[derive(Clone)]
pub struct Client {
    host: String,
    agent: String,
    client: reqwest_middleware::ClientWithMiddleware,
    credentials: Option<Credentials>,
}

#[derive(Clone, Copy, Default)]
pub enum MediaType {
    /// Return json (the default)
    #[default]
    Json,
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MediaType::Json => write!(f, "application/vnd.github+json"),
        }
    }
}

/// Authentication credentials supported by the client.
#[derive(PartialEq, Clone)]
pub enum Credentials {
    /// Personal access token or installation token, sent as a bearer token
    Token(String),
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Token(value) => f
                .debug_tuple("Credentials::Token")
                .field(&"*".repeat(value.len()))
                .finish(),
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct Link {
    /// A parsed form of the URI
    pub uri: Url,

    /// The raw text string of the URI
    pub raw_uri: String,
}

type Rel = String;
pub type RelLinkMap = HashMap<Rel, Link>;

#[derive(Debug)]
pub struct LinkHeader {
    links: RelLinkMap,
}

impl LinkHeader {
    // link: <https://api.github.com/repositories/1300192/issues?page=2>; rel="prev", <https://api.github.com/repositories/1300192/issues?page=4>; rel="next"
    fn parse(header: &str) -> ClientResult<Self> {
        let mut links = RelLinkMap::new();
        for part in header.split(',') {
            let sections: Vec<&str> = part.trim().split(';').collect();
            if sections.len() < 2 {
                continue;
            }

            let raw_url = sections[0]
                .trim()
                .trim_start_matches('<')
                .trim_end_matches('>');
            let mut rel = "";
            for param in &sections[1..] {
                let trimmed = param.trim();
                if trimmed.starts_with("rel=") {
                    rel = trimmed.trim_start_matches("rel=").trim_matches('"');
                }
            }

            if !rel.is_empty() {
                links.insert(
                    rel.to_string(),
                    Link {
                        raw_uri: raw_url.to_string(),
                        uri: Url::from_str(raw_url)?,
                    },
                );
            }
        }

        Ok(Self { links })
    }

    fn get(&self, rel: &str) -> Option<&Link> {
        self.links.get(rel)
    }
}

impl Client {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.host.trim_end_matches('/'), path)
    }

    pub(crate) fn url_with_query(&self, path: &str, query: &[(&str, String)]) -> ClientResult<String> {
        let url = Url::parse_with_params(&self.url(path), query)?;
        Ok(url.to_string())
    }

    async fn request<Out>(
        &self,
        method: http::Method,
        uri: &str,
        message: Message,
        media_type: MediaType,
    ) -> ClientResult<(Option<LinkHeader>, Response<Out>)>
    where
        Out: serde::de::DeserializeOwned + 'static + Send,
    {
        let req = self.make_request(method, uri, message, media_type)?;

        let response = req.send().await?;

        let status = response.status();
        let headers = response.headers().clone();
        let link = response
            .headers()
            .get(http::header::LINK)
            .and_then(|l| l.to_str().ok())
            .and_then(|l| LinkHeader::parse(l).ok());

        let response_body = response.bytes().await?;

        if status.is_success() {
            debug!("Received successful response. Read payload.");

            let parsed_response = if status == StatusCode::NO_CONTENT
                || std::any::TypeId::of::<Out>() == std::any::TypeId::of::<()>()
            {
                serde_json::from_str("null")?
            } else {
                serde_json::from_slice::<Out>(&response_body)?
            };
            Ok((link, Response::new(status, headers, parsed_response)))
        } else {
            let error_msg = if response_body.is_empty() {
                "empty response".to_string()
            } else {
                String::from_utf8_lossy(&response_body).to_string()
            };

            Err(ClientError::HttpError {
                status,
                headers,
                error: error_msg,
            })
        }
    }

    async fn request_entity<D>(
        &self,
        method: http::Method,
        uri: &str,
        message: Message,
        media_type: MediaType,
    ) -> ClientResult<Response<D>>
    where
        D: serde::de::DeserializeOwned + 'static + Send,
    {
        let (_, r) = self.request(method, uri, message, media_type).await?;
        Ok(r)
    }

    pub(crate) async fn get<D>(&self, uri: &str, message: Message) -> ClientResult<Response<D>>
    where
        D: serde::de::DeserializeOwned + 'static + Send,
    {
        self.request_entity(http::Method::GET, uri, message, MediaType::Json)
            .await
    }

    /// Follows `rel="next"` links until the last page and concatenates the items
    pub(crate) async fn get_all_pages<D>(&self, uri: &str) -> ClientResult<Response<Vec<D>>>
    where
        D: serde::de::DeserializeOwned + 'static + Send,
    {
        let mut global_items = Vec::new();
        let (mut link, mut response) = self.get_pages(uri).await?;
        loop {
            global_items.append(&mut response.body);

            let Some(next_link) = link.as_ref().and_then(|l| l.get("next")) else {
                break;
            };

            let (new_link, new_response) = self.get_pages(next_link.uri.as_str()).await?;
            link = new_link;
            response = new_response;
        }

        Ok(Response::new(
            response.status,
            response.headers,
            global_items,
        ))
    }

    async fn get_pages<D>(&self, uri: &str) -> ClientResult<(Option<LinkHeader>, Response<Vec<D>>)>
    where
        D: serde::de::DeserializeOwned + 'static + Send,
    {
        self.request(http::Method::GET, uri, Message::default(), MediaType::Json)
            .await
    }

    fn make_request(
        &self,
        method: http::Method,
        uri: &str,
        message: Message,
        media_type: MediaType,
    ) -> ClientResult<reqwest_middleware::RequestBuilder> {
        let url = uri.parse::<reqwest::Url>()?;

        let mut req = self.client.request(method, url);

        if let Some(content_type) = &message.content_type {
            req = req.header(http::header::CONTENT_TYPE, content_type.clone());
        }

        req = req.header(http::header::USER_AGENT, &*self.agent);
        req = req.header(http::header::ACCEPT, &media_type.to_string());
        req = req.header(GITHUB_API_VERSION_HEADER, GITHUB_API_VERSION);

        match &self.credentials {
            Some(Credentials::Token(token)) => {
                req = req.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
            }
            None => warn!("sending unauthenticated request to {uri}"),
        }

        if let Some(body) = message.body {
            req = req.body(body);
        }

        Ok(req)
    }

    pub(crate) async fn post<D>(&self, uri: &str, message: Message) -> ClientResult<Response<D>>
    where
        D: serde::de::DeserializeOwned + 'static + Send,
    {
        self.request_entity(http::Method::POST, uri, message, MediaType::Json)
            .await
    }

    pub fn issues(&self) -> issues::Issues {
        issues::Issues::new(self.clone())
    }

    pub fn pull_requests(&self) -> pulls::PullRequests {
        pulls::PullRequests::new(self.clone())
    }

    pub fn repos(&self) -> repos::Repos {
        repos::Repos::new(self.clone())
    }
}

pub struct ClientBuilder {
    host: String,
    agent: String,
    http: reqwest::Client,
    middleware: Vec<Arc<dyn Middleware>>,
    credentials: Option<Credentials>,
}

impl ClientBuilder {
    pub fn new() -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            host: DEFAULT_HOST.to_string(),
            agent: format!("{}/{}", DEFAULT_CLIENT_AGENT, env!("CARGO_PKG_VERSION")),
            http,
            middleware: Vec::new(),
            credentials: None,
        })
    }

    pub fn with_host_override(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    pub fn add_middleware<M>(self, middleware: M) -> Self
    where
        M: Middleware,
    {
        self.add_middleware_arc(Arc::new(middleware))
    }

    fn add_middleware_arc(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Convenience method to attach tracing middleware
    pub fn with_tracing(self) -> Self {
        self.add_middleware(TracingMiddleware::default())
    }

    /// Convenience method to attach retry middleware
    pub fn with_retry(self) -> Self {
        let retry_policy =
            reqwest_retry::policies::ExponentialBackoff::builder().build_with_max_retries(3);
        self.add_middleware(RetryTransientMiddleware::new_with_policy(retry_policy))
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn build(self) -> ClientResult<Client> {
        let mut builder = reqwest_middleware::ClientBuilder::new(self.http);
        for middleware in self.middleware {
            builder = builder.with_arc(middleware)
        }

        Ok(Client {
            host: self.host,
            agent: self.agent,
            client: builder.build(),
            credentials: self.credentials,
        })
    }
}
