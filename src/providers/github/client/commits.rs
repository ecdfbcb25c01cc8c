use chrono::{DateTime, Utc};
use graphql_client::QueryBody;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::core::GitHubClient;
use crate::error::{CommitLensError, Result};

/// GitHub caps a history connection page at 100 nodes.
pub const HISTORY_LIMIT: i64 = 100;

const COMMIT_HISTORY_QUERY: &str = r#"
query CommitHistory($owner: String!, $repo: String!, $since: GitTimestamp!, $first: Int!) {
  repository(owner: $owner, name: $repo) {
    defaultBranchRef {
      target {
        ... on Commit {
          history(since: $since, first: $first) {
            nodes {
              oid
              author {
                name
                email
              }
              message
              committedDate
              additions
              deletions
              changedFiles
            }
          }
        }
      }
    }
  }
}
"#;

#[derive(Debug, Serialize)]
pub struct CommitHistoryVariables {
    pub owner: String,
    pub repo: String,
    pub since: String,
    pub first: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitHistoryData {
    repository: Option<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryNode {
    default_branch_ref: Option<RefNode>,
}

#[derive(Debug, Deserialize)]
struct RefNode {
    target: Option<TargetNode>,
}

/// A non-commit target matches no fragment and decodes with no history.
#[derive(Debug, Deserialize)]
struct TargetNode {
    history: Option<HistoryConnection>,
}

#[derive(Debug, Deserialize)]
struct HistoryConnection {
    #[serde(default)]
    nodes: Vec<Option<CommitNode>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitNode {
    pub oid: String,
    pub author: Option<GitActor>,
    pub message: String,
    pub committed_date: DateTime<Utc>,
    pub additions: u64,
    pub deletions: u64,
    pub changed_files: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitActor {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl GitHubClient {
    /// Fetch the default-branch history of `owner/repo` since `since` (ISO-8601).
    ///
    /// Nodes are returned in the order GitHub sends them.
    ///
    /// # Errors
    /// Returns [`CommitLensError::Fetch`] carrying the raw response body when the
    /// status is not a success, the body carries GraphQL errors, or the
    /// repository cannot be resolved.
    pub async fn fetch_commit_history(
        &self,
        owner: &str,
        repo: &str,
        since: &str,
    ) -> Result<Vec<CommitNode>> {
        let request_body = QueryBody {
            variables: CommitHistoryVariables {
                owner: owner.to_string(),
                repo: repo.to_string(),
                since: since.to_string(),
                first: HISTORY_LIMIT,
            },
            query: COMMIT_HISTORY_QUERY,
            operation_name: "CommitHistory",
        };

        let request = self
            .client
            .post(self.graphql_url.clone())
            .json(&request_body);
        let request = self.auth_request(request);

        let response = request.send().await?;
        let status = response.status();
        let raw = response.text().await?;
        debug!("GraphQL commit history responded with {status}");

        if !status.is_success() {
            return Err(CommitLensError::Fetch(raw));
        }

        let response_body: graphql_client::Response<CommitHistoryData> =
            serde_json::from_str(&raw).map_err(|_| CommitLensError::Fetch(raw.clone()))?;

        if response_body.errors.as_ref().is_some_and(|e| !e.is_empty()) {
            return Err(CommitLensError::Fetch(raw));
        }

        let data = response_body
            .data
            .ok_or_else(|| CommitLensError::Fetch(raw.clone()))?;

        let repository = data.repository.ok_or_else(|| {
            CommitLensError::Fetch(format!("Repository '{owner}/{repo}' not found: {raw}"))
        })?;

        let Some(history) = repository
            .default_branch_ref
            .and_then(|r| r.target)
            .and_then(|t| t.history)
        else {
            warn!("Repository '{owner}/{repo}' has no default branch history");
            return Ok(Vec::new());
        };

        Ok(history.nodes.into_iter().flatten().collect())
    }
}
