use std::sync::Arc;

use github_client::webhook::{
    IssuesWebhookEventAction, PullRequestWebhookEventAction, WebhookEvent, WebhookEventPayload,
};
use sig_ownership::{GovernancePlatform, OwnershipResolver, ResolvedOwners, SigResolver};
use tracing::{debug, error, info, instrument, warn};

use crate::configuration::{config_for, BotConfig};
use crate::errors::{WelcomeError, WelcomeErrors, WelcomeResult};
use crate::message::{WelcomeContext, WelcomeMessages};
use crate::newcomer::{NewcomerStatistics, NEWCOMER_LABEL};
use crate::platform::Messenger;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Issue,
    PullRequest,
}

/// The newly opened issue or pull request to greet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WelcomeTarget {
    pub org: String,
    pub repo: String,
    pub number: u64,
    pub author: String,
    pub kind: TargetKind,
}

impl WelcomeTarget {
    /// `None` for events other than an opened issue or pull request
    pub fn from_event(event: &WebhookEvent) -> Option<Self> {
        let repository = event.repository.as_ref()?;
        let org = repository.owner_login()?.to_string();
        let repo = repository.name.clone();

        let (number, user, kind) = match &event.specific {
            WebhookEventPayload::PullRequest(payload)
                if payload.action == PullRequestWebhookEventAction::Opened =>
            {
                (
                    payload.number,
                    payload.pull_request.user.as_deref(),
                    TargetKind::PullRequest,
                )
            }
            WebhookEventPayload::Issues(payload)
                if payload.action == IssuesWebhookEventAction::Opened =>
            {
                (payload.issue.number, payload.issue.user.as_deref(), TargetKind::Issue)
            }
            _ => return None,
        };

        let author = user.or(event.sender.as_ref())?.login.clone();

        Some(Self {
            org,
            repo,
            number,
            author,
            kind,
        })
    }
}

pub struct WelcomeHandler {
    config_items: Vec<BotConfig>,
    platform: Arc<dyn GovernancePlatform>,
    messenger: Arc<dyn Messenger>,
    newcomers: Arc<dyn NewcomerStatistics>,
    sigs: SigResolver,
    owners: OwnershipResolver,
    messages: WelcomeMessages,
}

impl WelcomeHandler {
    pub fn new(
        config_items: Vec<BotConfig>,
        platform: Arc<dyn GovernancePlatform>,
        messenger: Arc<dyn Messenger>,
        newcomers: Arc<dyn NewcomerStatistics>,
    ) -> WelcomeResult<Self> {
        Ok(Self {
            config_items,
            sigs: SigResolver::new(Arc::clone(&platform)),
            owners: OwnershipResolver::new(Arc::clone(&platform)),
            platform,
            messenger,
            newcomers,
            messages: WelcomeMessages::new()?,
        })
    }

    pub async fn handle_event(&self, event: WebhookEvent) -> WelcomeResult<()> {
        match WelcomeTarget::from_event(&event) {
            Some(target) => self.welcome(&target).await,
            None => {
                debug!("ignoring {:?} event", event.kind);
                Ok(())
            }
        }
    }

    #[instrument(skip(self, target), fields(org = %target.org, repo = %target.repo, number = target.number))]
    pub async fn welcome(&self, target: &WelcomeTarget) -> WelcomeResult<()> {
        let config = config_for(&self.config_items, &target.org, &target.repo).ok_or_else(|| {
            WelcomeError::NoConfig {
                org: target.org.clone(),
                repo: target.repo.clone(),
            }
        })?;

        let sig = self
            .sigs
            .resolve_sig(&target.org, &target.repo, &config.governance())
            .await?;
        if sig.is_empty() {
            return Err(WelcomeError::SigNotFound {
                org: target.org.clone(),
                repo: target.repo.clone(),
            });
        }

        let owners = self.resolve_owners(target, config, &sig).await;
        let sig_link = config.sig_link(&sig);
        let comment = self.messages.render(&WelcomeContext {
            author: &target.author,
            community_name: &config.community_name,
            command_link: &config.command_link,
            sig: &sig,
            sig_link: &sig_link,
            maintainers: &owners.primary,
            committers: &owners.secondary,
        })?;

        let mut errors = WelcomeErrors::default();

        if target.kind == TargetKind::PullRequest {
            if let Some(endpoint) = &config.newcomer_endpoint {
                if let Err(e) = self.label_newcomer(target, endpoint).await {
                    errors.push(e);
                }
            }
        }

        match self
            .messenger
            .create_comment(&target.org, &target.repo, target.number, &comment)
            .await
        {
            Ok(()) => info!("welcomed {} with sig {sig}", target.author),
            Err(e) => errors.push(e),
        }

        let label = format!("sig/{sig}");
        if let Err(e) = self.ensure_repository_label(&target.org, &target.repo, &label).await {
            error!("create repo label {label} failed: {e}");
        }

        if let Err(e) = self
            .messenger
            .add_labels(&target.org, &target.repo, target.number, &[label])
            .await
        {
            errors.push(e);
        }

        errors.into_result()
    }

    async fn resolve_owners(&self, target: &WelcomeTarget, config: &BotConfig, sig: &str) -> ResolvedOwners {
        let changed_files = if target.kind == TargetKind::PullRequest && config.welcome_simpler {
            self.platform
                .pull_request_files(&target.org, &target.repo, target.number)
                .await
                .unwrap_or_else(|e| {
                    warn!("get pr changes failed: {e}");
                    Vec::new()
                })
        } else {
            Vec::new()
        };

        match self
            .owners
            .resolve_owners(
                &target.org,
                &target.repo,
                sig,
                &changed_files,
                &config.ownership_policy(),
            )
            .await
        {
            Ok(resolution) => {
                if let Some(e) = resolution.fallback_error {
                    warn!("sig information unavailable, using collaborators: {e}");
                }
                resolution.owners
            }
            Err(e) => {
                warn!("unable to resolve owners: {e}");
                ResolvedOwners::default()
            }
        }
    }

    async fn label_newcomer(&self, target: &WelcomeTarget, endpoint: &str) -> WelcomeResult<()> {
        let total = self
            .newcomers
            .pull_request_total(endpoint, &target.author)
            .await?;
        if total == 0 {
            self.messenger
                .add_labels(
                    &target.org,
                    &target.repo,
                    target.number,
                    &[NEWCOMER_LABEL.to_string()],
                )
                .await?;
        }

        Ok(())
    }

    async fn ensure_repository_label(&self, org: &str, repo: &str, label: &str) -> WelcomeResult<()> {
        let labels = self.messenger.repository_labels(org, repo).await?;
        if !labels.iter().any(|l| l == label) {
            self.messenger.create_repository_label(org, repo, label).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use github_client::webhook::WebhookEvent;
    use sig_ownership::testing::FakePlatform;
    use sig_ownership::{PlatformError, PlatformResult};

    use super::{TargetKind, WelcomeHandler, WelcomeTarget};
    use crate::configuration::{BotConfig, RepoFilter};
    use crate::errors::{WelcomeError, WelcomeResult};
    use crate::newcomer::NewcomerStatistics;
    use crate::platform::Messenger;

    #[derive(Default)]
    pub(crate) struct RecordingMessenger {
        pub comments: Mutex<Vec<(u64, String)>>,
        pub labels: Mutex<Vec<(u64, String)>>,
        pub repository_labels: Mutex<Vec<String>>,
        pub created_labels: Mutex<Vec<String>>,
        pub fail_comments: bool,
    }

    #[async_trait]
    impl Messenger for RecordingMessenger {
        async fn create_comment(&self, _org: &str, _repo: &str, number: u64, body: &str) -> PlatformResult<()> {
            if self.fail_comments {
                return Err(PlatformError::Transport("comment rejected".into()));
            }
            self.comments.lock().unwrap().push((number, body.to_string()));
            Ok(())
        }

        async fn add_labels(&self, _org: &str, _repo: &str, number: u64, labels: &[String]) -> PlatformResult<()> {
            let mut recorded = self.labels.lock().unwrap();
            recorded.extend(labels.iter().map(|l| (number, l.clone())));
            Ok(())
        }

        async fn repository_labels(&self, _org: &str, _repo: &str) -> PlatformResult<Vec<String>> {
            Ok(self.repository_labels.lock().unwrap().clone())
        }

        async fn create_repository_label(&self, _org: &str, _repo: &str, label: &str) -> PlatformResult<()> {
            self.created_labels.lock().unwrap().push(label.to_string());
            self.repository_labels.lock().unwrap().push(label.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    pub(crate) struct FixedNewcomers {
        pub totals: HashMap<String, u64>,
    }

    #[async_trait]
    impl NewcomerStatistics for FixedNewcomers {
        async fn pull_request_total(&self, _endpoint: &str, author: &str) -> WelcomeResult<u64> {
            Ok(self.totals.get(author).copied().unwrap_or(0))
        }
    }

    pub(crate) fn bot_config() -> BotConfig {
        BotConfig {
            filter: RepoFilter {
                repos: vec!["openeuler".to_string()],
                excluded_repos: Vec::new(),
            },
            community_name: "openeuler".to_string(),
            community_org: None,
            command_link: "https://example.com/commands".to_string(),
            community_repo: "community".to_string(),
            branch: "master".to_string(),
            welcome_simpler: false,
            file_path: None,
            file_branch: None,
            sig_link_prefix: None,
            newcomer_endpoint: None,
        }
    }

    pub(crate) fn governed_platform() -> FakePlatform {
        FakePlatform::default()
            .with_tree(["sig/Kernel/openeuler/k/kernel.yaml"])
            .with_collaborator("alice", &[("push", true)])
            .with_collaborator("bob", &[("pull", true)])
            .with_content("openeuler", "community", "sig/Kernel/OWNERS", "maintainers: []")
    }

    fn handler(
        config: BotConfig,
        platform: FakePlatform,
        messenger: Arc<RecordingMessenger>,
        newcomers: FixedNewcomers,
    ) -> WelcomeHandler {
        WelcomeHandler::new(vec![config], Arc::new(platform), messenger, Arc::new(newcomers)).unwrap()
    }

    fn target(kind: TargetKind) -> WelcomeTarget {
        WelcomeTarget {
            org: "openeuler".to_string(),
            repo: "kernel".to_string(),
            number: 7,
            author: "newbie".to_string(),
            kind,
        }
    }

    #[tokio::test]
    async fn welcomes_issue_with_collaborators() {
        let messenger = Arc::new(RecordingMessenger::default());
        let handler = handler(
            bot_config(),
            governed_platform(),
            Arc::clone(&messenger),
            FixedNewcomers::default(),
        );

        handler.welcome(&target(TargetKind::Issue)).await.unwrap();

        let comments = messenger.comments.lock().unwrap();
        assert_eq!(1, comments.len());
        assert_eq!(7, comments[0].0);
        assert!(comments[0].1.contains("Hi ***newbie***"));
        assert!(comments[0].1.ends_with("and any of the maintainers: @alice"));
        assert_eq!(vec!["sig/Kernel".to_string()], *messenger.created_labels.lock().unwrap());
        assert_eq!(vec![(7, "sig/Kernel".to_string())], *messenger.labels.lock().unwrap());
    }

    #[tokio::test]
    async fn existing_repository_label_is_not_recreated() {
        let messenger = Arc::new(RecordingMessenger::default());
        messenger
            .repository_labels
            .lock()
            .unwrap()
            .push("sig/Kernel".to_string());
        let handler = handler(
            bot_config(),
            governed_platform(),
            Arc::clone(&messenger),
            FixedNewcomers::default(),
        );

        handler.welcome(&target(TargetKind::Issue)).await.unwrap();

        assert!(messenger.created_labels.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn sig_information_supersedes_collaborators() {
        let platform = FakePlatform::default()
            .with_tree(["sig/Kernel/openeuler/k/kernel.yaml"])
            .with_collaborator("alice", &[("push", true)])
            .with_content(
                "openeuler",
                "community",
                "sig/Kernel/sig-info.yaml",
                r#"
name: Kernel
maintainers:
  - gitee_id: Carol
repositories:
  - repo: [openeuler/kernel]
    committers:
      - gitee_id: Dave
"#,
            );
        let messenger = Arc::new(RecordingMessenger::default());
        let handler = handler(bot_config(), platform, Arc::clone(&messenger), FixedNewcomers::default());

        handler.welcome(&target(TargetKind::Issue)).await.unwrap();

        let comments = messenger.comments.lock().unwrap();
        assert!(comments[0]
            .1
            .ends_with("and any of the maintainers: @carol or the committers: @Dave"));
    }

    #[tokio::test]
    async fn pull_request_attributed_by_changed_paths() {
        let mut config = bot_config();
        config.welcome_simpler = true;
        config.file_path = Some("OWNERSHIP.yaml".to_string());
        let platform = governed_platform()
            .with_pull_request_files(7, &["docs/en/intro.md"])
            .with_content(
                "openeuler",
                "kernel",
                "OWNERSHIP.yaml",
                r#"
relations:
  - path: [docs/*/]
    owner:
      - gitee_id: Writer
"#,
            );
        let messenger = Arc::new(RecordingMessenger::default());
        let handler = handler(config, platform, Arc::clone(&messenger), FixedNewcomers::default());

        handler.welcome(&target(TargetKind::PullRequest)).await.unwrap();

        let comments = messenger.comments.lock().unwrap();
        assert!(comments[0].1.ends_with("and any of the maintainers: @Writer"));
    }

    #[tokio::test]
    async fn newcomer_label_added_for_first_pull_request() {
        let mut config = bot_config();
        config.newcomer_endpoint = Some("https://stats.example.com/pulls".to_string());
        let messenger = Arc::new(RecordingMessenger::default());
        let handler = handler(
            config,
            governed_platform(),
            Arc::clone(&messenger),
            FixedNewcomers::default(),
        );

        handler.welcome(&target(TargetKind::PullRequest)).await.unwrap();

        let labels = messenger.labels.lock().unwrap();
        assert!(labels.contains(&(7, "newcomer".to_string())));
        assert!(labels.contains(&(7, "sig/Kernel".to_string())));
    }

    #[tokio::test]
    async fn returning_contributor_is_not_labelled() {
        let mut config = bot_config();
        config.newcomer_endpoint = Some("https://stats.example.com/pulls".to_string());
        let messenger = Arc::new(RecordingMessenger::default());
        let newcomers = FixedNewcomers {
            totals: HashMap::from([("newbie".to_string(), 4)]),
        };
        let handler = handler(config, governed_platform(), Arc::clone(&messenger), newcomers);

        handler.welcome(&target(TargetKind::PullRequest)).await.unwrap();

        assert!(!messenger
            .labels
            .lock()
            .unwrap()
            .iter()
            .any(|(_, l)| l == "newcomer"));
    }

    #[tokio::test]
    async fn issues_skip_newcomer_lookup() {
        let mut config = bot_config();
        config.newcomer_endpoint = Some("https://stats.example.com/pulls".to_string());
        let messenger = Arc::new(RecordingMessenger::default());
        let handler = handler(
            config,
            governed_platform(),
            Arc::clone(&messenger),
            FixedNewcomers::default(),
        );

        handler.welcome(&target(TargetKind::Issue)).await.unwrap();

        assert_eq!(vec![(7, "sig/Kernel".to_string())], *messenger.labels.lock().unwrap());
    }

    #[tokio::test]
    async fn unknown_sig_aborts_without_posting() {
        let platform = FakePlatform::default().with_tree(["sig/Other/openeuler/o/other.yaml"]);
        let messenger = Arc::new(RecordingMessenger::default());
        let handler = handler(bot_config(), platform, Arc::clone(&messenger), FixedNewcomers::default());

        let error = handler.welcome(&target(TargetKind::Issue)).await.unwrap_err();

        assert!(matches!(error, WelcomeError::SigNotFound { .. }));
        assert!(messenger.comments.lock().unwrap().is_empty());
        assert!(messenger.labels.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unconfigured_repository_is_an_error() {
        let messenger = Arc::new(RecordingMessenger::default());
        let handler = handler(
            bot_config(),
            governed_platform(),
            Arc::clone(&messenger),
            FixedNewcomers::default(),
        );
        let mut target = target(TargetKind::Issue);
        target.org = "src-openeuler".to_string();

        let error = handler.welcome(&target).await.unwrap_err();

        assert!(matches!(error, WelcomeError::NoConfig { .. }));
    }

    #[tokio::test]
    async fn collaborator_failure_still_posts_generic_message() {
        let platform = FakePlatform::default()
            .with_tree(["sig/Kernel/openeuler/k/kernel.yaml"])
            .failing_collaborators();
        let messenger = Arc::new(RecordingMessenger::default());
        let handler = handler(bot_config(), platform, Arc::clone(&messenger), FixedNewcomers::default());

        handler.welcome(&target(TargetKind::Issue)).await.unwrap();

        let comments = messenger.comments.lock().unwrap();
        assert!(comments[0].1.ends_with("and any of the maintainers."));
    }

    #[tokio::test]
    async fn posting_errors_are_aggregated() {
        let messenger = Arc::new(RecordingMessenger {
            fail_comments: true,
            ..Default::default()
        });
        let handler = handler(
            bot_config(),
            governed_platform(),
            Arc::clone(&messenger),
            FixedNewcomers::default(),
        );

        let error = handler.welcome(&target(TargetKind::Issue)).await.unwrap_err();

        let WelcomeError::Aggregate(errors) = error else {
            panic!("expected aggregated errors");
        };
        assert_eq!(1, errors.len());
        assert_eq!(vec![(7, "sig/Kernel".to_string())], *messenger.labels.lock().unwrap());
    }

    #[test]
    fn target_from_opened_pull_request() {
        let body = serde_json::json!({
            "action": "opened",
            "number": 7,
            "pull_request": {"id": 1, "number": 7, "user": {"login": "newbie", "id": 3}},
            "repository": {"id": 9, "name": "kernel", "full_name": "openeuler/kernel"},
            "sender": {"login": "someone-else", "id": 4}
        })
        .to_string();
        let event = WebhookEvent::try_from_header_and_body("pull_request", &body).unwrap();

        assert_eq!(
            Some(WelcomeTarget {
                org: "openeuler".to_string(),
                repo: "kernel".to_string(),
                number: 7,
                author: "newbie".to_string(),
                kind: TargetKind::PullRequest,
            }),
            WelcomeTarget::from_event(&event)
        );
    }

    #[test]
    fn closed_issue_is_ignored() {
        let body = serde_json::json!({
            "action": "closed",
            "issue": {"id": 1, "number": 7, "user": {"login": "newbie", "id": 3}},
            "repository": {"id": 9, "name": "kernel", "full_name": "openeuler/kernel"}
        })
        .to_string();
        let event = WebhookEvent::try_from_header_and_body("issues", &body).unwrap();

        assert_eq!(None, WelcomeTarget::from_event(&event));
    }
}
