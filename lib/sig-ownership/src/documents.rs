//! Governance documents fetched from the community repository.
//!
//! Two shapes are understood:
//!
//! * the SIG information document (`sig/<sig>/sig-info.yaml`) listing maintainers and, per group of
//!   repositories, the committers.
//! * the ownership relations document used for path attribution, pairing path patterns with owners.
//!
//! Both arrive base64 encoded from the content API.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pattern::PathPattern;

#[remain::sorted]
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid ownership pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type DocumentResult<T> = Result<T, DocumentError>;

/// A person listed in a governance document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gitee_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Member {
    fn id(&self) -> Option<&str> {
        self.gitee_id.as_deref().filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryAdmins {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repo: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub admins: Vec<Member>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub committers: Vec<Member>,
    #[serde(rename = "contributor", default, skip_serializing_if = "Vec::is_empty")]
    pub contributors: Vec<Member>,
}

/// Raw `sig-info.yaml` content
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigInfo {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mailing_list: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mature_level: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mentors: Vec<Member>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub maintainers: Vec<Member>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repositories: Vec<RepositoryAdmins>,
}

/// Contacts extracted from a SIG information document.
///
/// Maintainer ids are lowercased, committer ids are kept as written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SigInfoDocument {
    pub name: String,
    pub maintainers: IndexSet<String>,
    pub committers: IndexSet<String>,
}

impl SigInfoDocument {
    pub fn parse(content: &str) -> DocumentResult<Self> {
        let info: SigInfo = serde_yaml::from_slice(&decode(content)?)?;
        Ok(Self::from(info))
    }
}

impl From<SigInfo> for SigInfoDocument {
    fn from(info: SigInfo) -> Self {
        let maintainers = info
            .maintainers
            .iter()
            .filter_map(Member::id)
            .map(str::to_lowercase)
            .collect();

        let committers = info
            .repositories
            .iter()
            .flat_map(|r| r.committers.iter())
            .filter_map(Member::id)
            .map(str::to_string)
            .collect();

        Self {
            name: info.name,
            maintainers,
            committers,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    #[serde(default)]
    pub path: Vec<String>,
    #[serde(default)]
    pub owner: Vec<Member>,
}

/// Raw ownership relations document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relations {
    #[serde(default)]
    pub relations: Vec<Relation>,
}

/// Path patterns paired with the owners to contact when a changed file matches any of them
#[derive(Debug, Clone)]
pub struct OwnershipRule {
    pub patterns: Vec<PathPattern>,
    pub owners: Vec<String>,
}

impl OwnershipRule {
    pub fn matches(&self, file_path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(file_path))
    }
}

impl TryFrom<Relation> for OwnershipRule {
    type Error = DocumentError;

    fn try_from(relation: Relation) -> DocumentResult<Self> {
        let patterns = relation
            .path
            .into_iter()
            .map(|pattern| {
                PathPattern::new(pattern.as_str())
                    .map_err(|source| DocumentError::Pattern { pattern, source })
            })
            .collect::<DocumentResult<Vec<_>>>()?;

        let owners = relation
            .owner
            .iter()
            .filter_map(Member::id)
            .map(str::to_string)
            .collect();

        Ok(Self { patterns, owners })
    }
}

/// Parse a base64 encoded relations document into ownership rules. Owner ids are kept as written.
pub fn parse_relations(content: &str) -> DocumentResult<Vec<OwnershipRule>> {
    let relations: Relations = serde_yaml::from_slice(&decode(content)?)?;
    relations
        .relations
        .into_iter()
        .map(OwnershipRule::try_from)
        .collect()
}

// the content API wraps base64 payloads at 60 columns
fn decode(content: &str) -> DocumentResult<Vec<u8>> {
    let compact: String = content
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    Ok(STANDARD.decode(compact)?)
}
