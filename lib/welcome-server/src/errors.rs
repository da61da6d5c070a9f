use std::fmt;

use github_client::ClientError;
use sig_ownership::{PlatformError, SigError};
use thiserror::Error;

use crate::configuration::ConfigurationError;

#[remain::sorted]
#[derive(Debug, Error)]
pub enum WelcomeError {
    #[error("{0}")]
    Aggregate(WelcomeErrors),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Newcomer(#[from] reqwest_middleware::Error),

    #[error("no config for this repo: {org}/{repo}")]
    NoConfig { org: String, repo: String },

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Sig(#[from] SigError),

    #[error("can't get sig name of repo: {org}/{repo}")]
    SigNotFound { org: String, repo: String },

    #[error(transparent)]
    Template(#[from] minijinja::Error),
}

pub type WelcomeResult<T> = Result<T, WelcomeError>;

/// Failures of independent posting steps, reported together
#[derive(Debug, Default)]
pub struct WelcomeErrors(Vec<WelcomeError>);

impl WelcomeErrors {
    pub fn push<E: Into<WelcomeError>>(&mut self, error: E) {
        self.0.push(error.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WelcomeError> {
        self.0.iter()
    }

    pub fn into_result(self) -> WelcomeResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(WelcomeError::Aggregate(self))
        }
    }
}

impl fmt::Display for WelcomeErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}
