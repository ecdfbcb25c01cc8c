//! Single-request repository operations run on behalf of a logged-in user.
//!
//! Every operation reports an [`OperationOutcome`] instead of an error so the
//! console can render it inline; no operation depends on another.

use std::fmt;

use log::{info, warn};

use super::client::{
    GitHubClient, IssueRequest, IssueUpdateRequest, Notification, PullRequestRequest,
    RepositoryRequest,
};
use crate::auth::ConsoleSession;
use crate::config::GitHubConfig;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Visibility {
    Public,
    Private,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    Succeeded(String),
    Failed(String),
}

impl OperationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    fn from_result<T>(
        result: Result<T>,
        on_success: impl FnOnce(T) -> String,
        failure: &str,
    ) -> Self {
        match result {
            Ok(value) => {
                let message = on_success(value);
                info!("{message}");
                Self::Succeeded(message)
            }
            Err(e) => {
                warn!("{failure}: {e}");
                Self::Failed(format!("{failure}: {e}"))
            }
        }
    }
}

impl fmt::Display for OperationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded(message) | Self::Failed(message) => f.write_str(message),
        }
    }
}

pub struct RepoOperationsClient {
    pub(super) client: GitHubClient,
}

impl RepoOperationsClient {
    pub fn new(config: &GitHubConfig, session: &ConsoleSession) -> Result<Self> {
        Ok(Self {
            client: GitHubClient::with_token(config, Some(session.token().clone()))?,
        })
    }

    pub async fn create_repository(
        &self,
        name: &str,
        description: &str,
        visibility: Visibility,
    ) -> OperationOutcome {
        let payload = RepositoryRequest {
            name,
            description,
            private: visibility == Visibility::Private,
        };

        OperationOutcome::from_result(
            self.client.create_repository(&payload).await,
            |()| format!("Repository {name} created successfully!"),
            "Failed to create repository",
        )
    }

    pub async fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        title: &str,
        body: &str,
        assignee: Option<&str>,
    ) -> OperationOutcome {
        let payload = IssueRequest {
            title,
            body,
            assignee: assignee.filter(|a| !a.trim().is_empty()),
        };

        OperationOutcome::from_result(
            self.client.create_issue(owner, repo, &payload).await,
            |()| format!("Issue '{title}' created successfully!"),
            "Failed to create issue",
        )
    }

    pub async fn update_issue(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        title: &str,
        body: &str,
    ) -> OperationOutcome {
        let payload = IssueUpdateRequest {
            title: Some(title),
            body: Some(body),
            state: None,
        };

        OperationOutcome::from_result(
            self.client.update_issue(owner, repo, number, &payload).await,
            |()| format!("Issue #{number} updated successfully!"),
            "Failed to update issue",
        )
    }

    pub async fn close_issue(&self, owner: &str, repo: &str, number: u64) -> OperationOutcome {
        let payload = IssueUpdateRequest {
            state: Some("closed"),
            ..IssueUpdateRequest::default()
        };

        OperationOutcome::from_result(
            self.client.update_issue(owner, repo, number, &payload).await,
            |()| format!("Issue #{number} closed successfully!"),
            "Failed to close issue",
        )
    }

    pub async fn create_pull_request(
        &self,
        owner: &str,
        repo: &str,
        title: &str,
        head: &str,
        base: &str,
        body: &str,
    ) -> OperationOutcome {
        let payload = PullRequestRequest {
            title,
            head,
            base,
            body,
        };

        OperationOutcome::from_result(
            self.client.create_pull_request(owner, repo, &payload).await,
            |()| format!("Pull Request '{title}' created successfully!"),
            "Failed to create pull request",
        )
    }

    pub async fn list_notifications(&self) -> OperationOutcome {
        match self.client.list_notifications().await {
            Ok(notifications) if notifications.is_empty() => {
                OperationOutcome::Failed("No notifications available.".to_string())
            }
            result => OperationOutcome::from_result(
                result,
                |notifications| render_notifications(&notifications),
                "Failed to fetch notifications",
            ),
        }
    }

    /// Login of the authenticated user, the default owner for issues and pull requests.
    pub async fn current_user(&self) -> Result<String> {
        self.client.current_user().await
    }
}

fn render_notifications(notifications: &[Notification]) -> String {
    notifications
        .iter()
        .map(|n| format!("**{}**: {}", n.repository.name, n.subject.title))
        .collect::<Vec<_>>()
        .join("\n")
}
