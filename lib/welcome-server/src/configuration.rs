use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;

use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use serde::Deserialize;
use sig_ownership::{GovernanceRepo, OwnershipPolicy, PathRules};
use thiserror::Error;

pub const ENV_PREFIX: &str = "SIG_WELCOME_";
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
const DEFAULT_PORT: u16 = 8888;

#[remain::sorted]
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("config_items[{index}]: the {field} configuration can not be empty")]
    EmptyField { index: usize, field: &'static str },

    #[error("config_items[{index}]: repos can not be empty")]
    EmptyRepos { index: usize },

    #[error(transparent)]
    Extract(#[from] Box<figment::Error>),

    #[error("config_items[{index}]: excluded repo {entry} is not of the form org/repo")]
    InvalidExcludedRepo { index: usize, entry: String },

    #[error("config_items[{index}]: file_path is required when welcome_simpler is enabled")]
    MissingFilePath { index: usize },

    #[error("config_items[{index}]: excluded repo {entry} is not covered by an org entry in repos")]
    UncoveredExcludedRepo { index: usize, entry: String },
}

pub type ConfigurationResult<T> = Result<T, ConfigurationError>;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfiguration,
    pub github: GithubConfiguration,
    #[serde(default)]
    pub log: LogConfiguration,
    #[serde(default)]
    pub config_items: Vec<BotConfig>,
}

impl Settings {
    pub fn validate(&self) -> ConfigurationResult<()> {
        for (index, item) in self.config_items.iter().enumerate() {
            item.validate(index)?;
        }

        Ok(())
    }

    pub fn config_for(&self, org: &str, repo: &str) -> Option<&BotConfig> {
        config_for(&self.config_items, org, repo)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfiguration {
    pub address: SocketAddr,
}

impl Default for ServerConfiguration {
    fn default() -> Self {
        Self {
            address: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct GithubConfiguration {
    pub token: String,
    /// API host override, e.g. for GitHub Enterprise
    #[serde(default)]
    pub host: Option<String>,
}

impl std::fmt::Debug for GithubConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubConfiguration")
            .field("token", &"*".repeat(self.token.len()))
            .field("host", &self.host)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfiguration {
    pub level: String,
}

impl Default for LogConfiguration {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Which repositories a config item applies to.
///
/// `repos` entries are either an org or `org/repo`. `excluded_repos` entries are `org/repo`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepoFilter {
    #[serde(default)]
    pub repos: Vec<String>,
    #[serde(default)]
    pub excluded_repos: Vec<String>,
}

/// How closely a filter matched a repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FilterMatch {
    Org,
    Repo,
}

impl RepoFilter {
    pub fn matches(&self, org: &str, repo: &str) -> Option<FilterMatch> {
        let full_name = format!("{org}/{repo}");
        if self.excluded_repos.iter().any(|r| *r == full_name) {
            return None;
        }

        if self.repos.iter().any(|r| *r == full_name) {
            Some(FilterMatch::Repo)
        } else if self.repos.iter().any(|r| r == org) {
            Some(FilterMatch::Org)
        } else {
            None
        }
    }

    fn validate(&self, index: usize) -> ConfigurationResult<()> {
        if self.repos.is_empty() {
            return Err(ConfigurationError::EmptyRepos { index });
        }

        for entry in &self.excluded_repos {
            let Some((org, repo)) = entry.split_once('/') else {
                return Err(ConfigurationError::InvalidExcludedRepo {
                    index,
                    entry: entry.clone(),
                });
            };
            if org.is_empty() || repo.is_empty() || repo.contains('/') {
                return Err(ConfigurationError::InvalidExcludedRepo {
                    index,
                    entry: entry.clone(),
                });
            }
            if !self.repos.iter().any(|r| r == org) {
                return Err(ConfigurationError::UncoveredExcludedRepo {
                    index,
                    entry: entry.clone(),
                });
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    #[serde(flatten)]
    pub filter: RepoFilter,

    /// Display name of the community
    pub community_name: String,

    /// Org owning the governance repository, defaults to `community_name`
    #[serde(default)]
    pub community_org: Option<String>,

    /// Link to the bot command help page
    pub command_link: String,

    /// Governance repository holding the `sig` tree
    pub community_repo: String,

    /// Branch of the governance repository
    pub branch: String,

    /// Attribute pull requests to owners of the changed paths
    #[serde(default)]
    pub welcome_simpler: bool,

    /// Ownership relations document, read from the target repository
    #[serde(default)]
    pub file_path: Option<String>,

    #[serde(default)]
    pub file_branch: Option<String>,

    #[serde(default)]
    pub sig_link_prefix: Option<String>,

    /// Newcomer statistics endpoint, queried with `?author=<login>`
    #[serde(default)]
    pub newcomer_endpoint: Option<String>,
}

impl BotConfig {
    pub fn community_org(&self) -> &str {
        self.community_org
            .as_deref()
            .unwrap_or(self.community_name.as_str())
    }

    pub fn governance(&self) -> GovernanceRepo {
        GovernanceRepo::new(self.community_org(), &self.community_repo, &self.branch)
    }

    pub fn ownership_policy(&self) -> OwnershipPolicy {
        let policy = OwnershipPolicy::new(self.governance());
        match (&self.file_path, self.welcome_simpler) {
            (Some(path), true) => policy.with_path_rules(PathRules {
                path: path.clone(),
                branch: self.file_branch.clone(),
            }),
            _ => policy,
        }
    }

    pub fn sig_link(&self, sig: &str) -> String {
        let prefix = match &self.sig_link_prefix {
            Some(prefix) => prefix.trim_end_matches('/').to_string(),
            None => format!(
                "https://github.com/{}/{}/tree/{}/sig",
                self.community_org(),
                self.community_repo,
                self.branch
            ),
        };
        format!("{prefix}/{sig}")
    }

    fn validate(&self, index: usize) -> ConfigurationResult<()> {
        let required = [
            ("community_name", &self.community_name),
            ("command_link", &self.command_link),
            ("community_repo", &self.community_repo),
            ("branch", &self.branch),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigurationError::EmptyField { index, field });
            }
        }

        if self.welcome_simpler && self.file_path.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigurationError::MissingFilePath { index });
        }

        self.filter.validate(index)
    }
}

/// The item whose filter matches most closely. An `org/repo` entry wins over an org entry,
/// ties go to the first item.
pub fn config_for<'a>(items: &'a [BotConfig], org: &str, repo: &str) -> Option<&'a BotConfig> {
    let mut best: Option<(FilterMatch, &BotConfig)> = None;
    for item in items {
        if let Some(found) = item.filter.matches(org, repo) {
            if best.map_or(true, |(current, _)| found > current) {
                best = Some((found, item));
            }
        }
    }

    best.map(|(_, item)| item)
}

pub fn get_configuration(path: &Path) -> ConfigurationResult<Settings> {
    let settings: Settings = Figment::new()
        .merge(Yaml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(Box::new)?;

    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use figment::Jail;

    use super::{config_for, get_configuration, ConfigurationError, FilterMatch, RepoFilter};

    const CONFIG: &str = r#"
github:
  token: abc
config_items:
  - repos: [openeuler]
    excluded_repos: [openeuler/infrastructure]
    community_name: openeuler
    command_link: https://example.com/commands
    community_repo: community
    branch: master
  - repos: [openeuler/kernel]
    community_name: openeuler
    community_org: openeuler
    command_link: https://example.com/commands
    community_repo: community
    branch: master
    welcome_simpler: true
    file_path: OWNERSHIP.yaml
    sig_link_prefix: https://gitee.com/openeuler/community/tree/master/sig/
"#;

    #[test]
    fn load_yaml_with_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file("config.yaml", CONFIG)?;

            let settings = get_configuration(Path::new("config.yaml")).unwrap();

            assert_eq!("0.0.0.0:8888", settings.server.address.to_string());
            assert_eq!("info", settings.log.level);
            assert_eq!("abc", settings.github.token);
            assert_eq!(2, settings.config_items.len());
            assert!(!settings.config_items[0].welcome_simpler);
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("config.yaml", CONFIG)?;
            jail.set_env("SIG_WELCOME_GITHUB__TOKEN", "from-env");
            jail.set_env("SIG_WELCOME_SERVER__ADDRESS", "127.0.0.1:9000");
            jail.set_env("SIG_WELCOME_LOG__LEVEL", "debug");

            let settings = get_configuration(Path::new("config.yaml")).unwrap();

            assert_eq!("from-env", settings.github.token);
            assert_eq!("127.0.0.1:9000", settings.server.address.to_string());
            assert_eq!("debug", settings.log.level);
            Ok(())
        });
    }

    #[test]
    fn exact_repo_wins_over_org() {
        Jail::expect_with(|jail| {
            jail.create_file("config.yaml", CONFIG)?;
            let settings = get_configuration(Path::new("config.yaml")).unwrap();

            let kernel = config_for(&settings.config_items, "openeuler", "kernel").unwrap();
            assert!(kernel.welcome_simpler);

            let docs = settings.config_for("openeuler", "docs").unwrap();
            assert!(!docs.welcome_simpler);

            assert!(settings.config_for("openeuler", "infrastructure").is_none());
            assert!(settings.config_for("src-openeuler", "kernel").is_none());
            Ok(())
        });
    }

    #[test]
    fn derived_locations() {
        Jail::expect_with(|jail| {
            jail.create_file("config.yaml", CONFIG)?;
            let settings = get_configuration(Path::new("config.yaml")).unwrap();

            let org_wide = &settings.config_items[0];
            assert_eq!("openeuler/community@master", org_wide.governance().to_string());
            assert_eq!(
                "https://github.com/openeuler/community/tree/master/sig/Kernel",
                org_wide.sig_link("Kernel")
            );
            assert!(org_wide.ownership_policy().path_rules.is_none());

            let kernel = &settings.config_items[1];
            assert_eq!(
                "https://gitee.com/openeuler/community/tree/master/sig/Kernel",
                kernel.sig_link("Kernel")
            );
            let path_rules = kernel.ownership_policy().path_rules.unwrap();
            assert_eq!("OWNERSHIP.yaml", path_rules.path);
            assert_eq!(None, path_rules.branch);
            Ok(())
        });
    }

    #[test]
    fn missing_token_fails_extraction() {
        Jail::expect_with(|jail| {
            jail.create_file("config.yaml", "config_items: []")?;

            let error = get_configuration(Path::new("config.yaml")).unwrap_err();
            assert!(matches!(error, ConfigurationError::Extract(_)));
            Ok(())
        });
    }

    #[test]
    fn empty_command_link_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r#"
github:
  token: abc
config_items:
  - repos: [openeuler]
    community_name: openeuler
    command_link: ""
    community_repo: community
    branch: master
"#,
            )?;

            let error = get_configuration(Path::new("config.yaml")).unwrap_err();
            assert!(matches!(
                error,
                ConfigurationError::EmptyField { index: 0, field: "command_link" }
            ));
            Ok(())
        });
    }

    #[test]
    fn welcome_simpler_requires_file_path() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r#"
github:
  token: abc
config_items:
  - repos: [openeuler]
    community_name: openeuler
    command_link: https://example.com
    community_repo: community
    branch: master
    welcome_simpler: true
"#,
            )?;

            let error = get_configuration(Path::new("config.yaml")).unwrap_err();
            assert!(matches!(error, ConfigurationError::MissingFilePath { index: 0 }));
            Ok(())
        });
    }

    #[test]
    fn excluded_repos_must_be_covered() {
        let filter = RepoFilter {
            repos: vec!["openeuler".to_string()],
            excluded_repos: vec!["src-openeuler/kernel".to_string()],
        };
        assert!(matches!(
            filter.validate(3),
            Err(ConfigurationError::UncoveredExcludedRepo { index: 3, .. })
        ));

        let filter = RepoFilter {
            repos: vec!["openeuler".to_string()],
            excluded_repos: vec!["kernel".to_string()],
        };
        assert!(matches!(
            filter.validate(0),
            Err(ConfigurationError::InvalidExcludedRepo { .. })
        ));

        let filter = RepoFilter::default();
        assert!(matches!(
            filter.validate(0),
            Err(ConfigurationError::EmptyRepos { index: 0 })
        ));
    }

    #[test]
    fn filter_match_kind() {
        let filter = RepoFilter {
            repos: vec!["openeuler".to_string(), "src-openeuler/kernel".to_string()],
            excluded_repos: vec!["openeuler/infrastructure".to_string()],
        };

        assert_eq!(Some(FilterMatch::Org), filter.matches("openeuler", "docs"));
        assert_eq!(Some(FilterMatch::Repo), filter.matches("src-openeuler", "kernel"));
        assert_eq!(None, filter.matches("openeuler", "infrastructure"));
        assert_eq!(None, filter.matches("src-openeuler", "gcc"));
    }
}
