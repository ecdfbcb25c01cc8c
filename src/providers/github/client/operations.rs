use chrono::{DateTime, Utc};
use reqwest::{Response, StatusCode};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use url::Url;

use super::core::GitHubClient;
use crate::error::{CommitLensError, Result};

#[derive(Debug, Serialize)]
pub struct RepositoryRequest<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub private: bool,
}

#[derive(Debug, Serialize)]
pub struct IssueRequest<'a> {
    pub title: &'a str,
    pub body: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<&'a str>,
}

/// Partial issue update; unset fields are left untouched by GitHub.
#[derive(Debug, Default, Serialize)]
pub struct IssueUpdateRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct PullRequestRequest<'a> {
    pub title: &'a str,
    pub head: &'a str,
    pub base: &'a str,
    pub body: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Notification {
    pub repository: NotificationRepository,
    pub subject: NotificationSubject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationRepository {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationSubject {
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryDetails {
    pub stargazers_count: u64,
    pub forks_count: u64,
    pub open_issues_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Actor {
    pub login: String,
}

/// An entry of the issues listing. Pull requests appear there too, marked by
/// a `pull_request` object.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueItem {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub user: Option<Actor>,
    pub pull_request: Option<IgnoredAny>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullItem {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub user: Option<Actor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRun {
    pub name: Option<String>,
    pub status: Option<String>,
    pub conclusion: Option<String>,
    pub run_started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct WorkflowRuns {
    workflow_runs: Vec<WorkflowRun>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitActivityWeek {
    /// Start of the week, Unix seconds.
    pub week: i64,
    pub total: u64,
}

#[derive(Debug, Deserialize)]
struct User {
    login: String,
}

fn is_repo_name(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

/// Reject owner or repository names GitHub could never resolve, before any request.
pub fn validate_repo_name(owner: &str, repo: &str) -> Result<()> {
    if owner.is_empty() || repo.is_empty() {
        return Err(CommitLensError::InvalidRepository(
            "Invalid repository format. Please use \"owner/repo\"".to_string(),
        ));
    }
    if !is_repo_name(owner) || !is_repo_name(repo) {
        return Err(CommitLensError::InvalidRepository(
            "Invalid repository name format".to_string(),
        ));
    }
    Ok(())
}

/// Fail unless `response` carries `expected`. Well-known failures get a readable
/// message; anything else keeps the body.
async fn expect_status(response: Response, expected: StatusCode) -> Result<Response> {
    let status = response.status();
    if status == expected {
        return Ok(response);
    }

    let message = match status {
        StatusCode::UNAUTHORIZED => {
            "Authentication failed. Please check your GitHub token.".to_string()
        }
        StatusCode::FORBIDDEN => {
            "API rate limit exceeded or access forbidden. Please try again later.".to_string()
        }
        StatusCode::NOT_FOUND => {
            "Repository not found. Please check the repository name.".to_string()
        }
        _ => {
            let body = response.text().await.unwrap_or_default();
            format!("expected {expected}, got {status}: {body}")
        }
    };
    Err(CommitLensError::Operation(message))
}

impl GitHubClient {
    fn repository_resource(&self, owner: &str, repo: &str, resource: &[&str]) -> Result<Url> {
        validate_repo_name(owner, repo)?;
        self.repository_url(owner, repo, resource)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let request = self.auth_request(self.client.get(url));
        let response = expect_status(request.send().await?, StatusCode::OK).await?;
        Ok(response.json::<T>().await?)
    }

    pub async fn create_repository(&self, payload: &RepositoryRequest<'_>) -> Result<()> {
        let url = self.rest_url("user/repos")?;
        let request = self.auth_request(self.client.post(url).json(payload));

        expect_status(request.send().await?, StatusCode::CREATED).await?;
        Ok(())
    }

    pub async fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        payload: &IssueRequest<'_>,
    ) -> Result<()> {
        let url = self.repository_resource(owner, repo, &["issues"])?;
        let request = self.auth_request(self.client.post(url).json(payload));

        expect_status(request.send().await?, StatusCode::CREATED).await?;
        Ok(())
    }

    pub async fn update_issue(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        payload: &IssueUpdateRequest<'_>,
    ) -> Result<()> {
        let number = number.to_string();
        let url = self.repository_resource(owner, repo, &["issues", number.as_str()])?;
        let request = self.auth_request(self.client.patch(url).json(payload));

        expect_status(request.send().await?, StatusCode::OK).await?;
        Ok(())
    }

    pub async fn create_pull_request(
        &self,
        owner: &str,
        repo: &str,
        payload: &PullRequestRequest<'_>,
    ) -> Result<()> {
        let url = self.repository_resource(owner, repo, &["pulls"])?;
        let request = self.auth_request(self.client.post(url).json(payload));

        expect_status(request.send().await?, StatusCode::CREATED).await?;
        Ok(())
    }

    pub async fn list_notifications(&self) -> Result<Vec<Notification>> {
        self.get_json(self.rest_url("notifications")?).await
    }

    /// Login of the user the token belongs to.
    pub async fn current_user(&self) -> Result<String> {
        let user: User = self.get_json(self.rest_url("user")?).await?;
        Ok(user.login)
    }

    pub async fn get_repository(&self, owner: &str, repo: &str) -> Result<RepositoryDetails> {
        self.get_json(self.repository_resource(owner, repo, &[])?).await
    }

    /// Issues in any state, newest first. Includes pull requests.
    pub async fn list_issues(&self, owner: &str, repo: &str, per_page: u8) -> Result<Vec<IssueItem>> {
        let mut url = self.repository_resource(owner, repo, &["issues"])?;
        newest_first(&mut url, per_page);
        self.get_json(url).await
    }

    /// Pull requests in any state, newest first.
    pub async fn list_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        per_page: u8,
    ) -> Result<Vec<PullItem>> {
        let mut url = self.repository_resource(owner, repo, &["pulls"])?;
        newest_first(&mut url, per_page);
        self.get_json(url).await
    }

    pub async fn list_workflow_runs(
        &self,
        owner: &str,
        repo: &str,
        per_page: u8,
    ) -> Result<Vec<WorkflowRun>> {
        let mut url = self.repository_resource(owner, repo, &["actions", "runs"])?;
        url.query_pairs_mut()
            .append_pair("per_page", &per_page.to_string());
        let runs: WorkflowRuns = self.get_json(url).await?;
        Ok(runs.workflow_runs)
    }

    /// Weekly commit totals for the last year. GitHub answers 202 while it is
    /// still computing them, which surfaces as an error here.
    pub async fn commit_activity(&self, owner: &str, repo: &str) -> Result<Vec<CommitActivityWeek>> {
        let url = self.repository_resource(owner, repo, &["stats", "commit_activity"])?;
        self.get_json(url).await
    }
}

fn newest_first(url: &mut Url, per_page: u8) {
    url.query_pairs_mut()
        .append_pair("state", "all")
        .append_pair("sort", "created")
        .append_pair("direction", "desc")
        .append_pair("per_page", &per_page.to_string());
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mockito::Matcher;
    use serde_json::json;

    use super::*;
    use crate::auth::Token;
    use crate::config::GitHubConfig;

    fn client(server: &mockito::Server) -> GitHubClient {
        let config = GitHubConfig::new(
            &server.url(),
            Some(Token::from("gho_test")),
            Duration::from_secs(5),
        )
        .unwrap();
        GitHubClient::new(&config).unwrap()
    }

    #[test]
    fn test_validate_repo_name() {
        assert!(validate_repo_name("acme", "widgets").is_ok());
        assert!(validate_repo_name("acme-corp", "widgets_v2.rs").is_ok());

        for (owner, repo) in [("", "widgets"), ("acme", "")] {
            let err = validate_repo_name(owner, repo).unwrap_err();
            assert_eq!(
                err.to_string(),
                "Invalid repository format. Please use \"owner/repo\""
            );
        }

        for (owner, repo) in [("acme", "wid gets"), ("ac/me", "widgets"), ("acme", "wïdgets")] {
            let err = validate_repo_name(owner, repo).unwrap_err();
            assert_eq!(err.to_string(), "Invalid repository name format");
        }
    }

    #[tokio::test]
    async fn test_invalid_repo_name_sends_nothing() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let payload = IssueRequest {
            title: "Crash",
            body: "",
            assignee: None,
        };
        let err = client(&server)
            .create_issue("acme", "../admin", &payload)
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, CommitLensError::InvalidRepository(_)));
    }

    #[tokio::test]
    async fn test_expect_status_maps_well_known_failures() {
        let mut server = mockito::Server::new_async().await;
        for (status, message) in [
            (401, "Authentication failed. Please check your GitHub token."),
            (403, "API rate limit exceeded or access forbidden. Please try again later."),
            (404, "Repository not found. Please check the repository name."),
        ] {
            let mock = server
                .mock("GET", "/repos/acme/widgets")
                .with_status(status)
                .with_body(r#"{"message":"nope"}"#)
                .create_async()
                .await;

            let err = client(&server)
                .get_repository("acme", "widgets")
                .await
                .unwrap_err();

            assert!(
                matches!(err, CommitLensError::Operation(ref m) if m == message),
                "{status}: {err}"
            );
            mock.remove_async().await;
        }
    }

    #[tokio::test]
    async fn test_update_issue_patches_only_given_fields() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PATCH", "/repos/acme/widgets/issues/42")
            .match_header("authorization", "Bearer gho_test")
            .match_body(Matcher::Json(json!({ "state": "closed" })))
            .with_status(200)
            .with_body(r#"{"number":42,"state":"closed"}"#)
            .create_async()
            .await;

        let payload = IssueUpdateRequest {
            state: Some("closed"),
            ..IssueUpdateRequest::default()
        };
        client(&server)
            .update_issue("acme", "widgets", 42, &payload)
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_list_issues_asks_for_newest_first() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/acme/widgets/issues")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("state".into(), "all".into()),
                Matcher::UrlEncoded("sort".into(), "created".into()),
                Matcher::UrlEncoded("direction".into(), "desc".into()),
                Matcher::UrlEncoded("per_page".into(), "5".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!([
                    {
                        "number": 3,
                        "title": "Crash",
                        "body": null,
                        "state": "open",
                        "created_at": "2024-05-02T10:00:00Z",
                        "user": { "login": "ada" }
                    },
                    {
                        "number": 2,
                        "title": "Faster sorting",
                        "body": "",
                        "state": "closed",
                        "created_at": "2024-05-01T10:00:00Z",
                        "user": null,
                        "pull_request": { "url": "https://api.github.com/repos/acme/widgets/pulls/2" }
                    }
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let issues = client(&server).list_issues("acme", "widgets", 5).await.unwrap();

        mock.assert_async().await;
        assert_eq!(issues.len(), 2);
        assert!(issues[0].pull_request.is_none());
        assert!(issues[1].pull_request.is_some());
        assert!(issues[1].user.is_none());
    }
}
