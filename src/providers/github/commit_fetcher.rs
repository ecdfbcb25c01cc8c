use chrono::{DateTime, Datelike, Duration, SecondsFormat, Utc};
use log::info;

use super::client::{CommitNode, GitHubClient};
use crate::config::GitHubConfig;
use crate::error::Result;
use crate::models::CommitRecord;

pub struct CommitFetcher {
    client: GitHubClient,
}

impl CommitFetcher {
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        Ok(Self {
            client: GitHubClient::new(config)?,
        })
    }

    /// Commits on the default branch of `owner/repo` from the last `days` days,
    /// at most 100, exactly as GitHub orders them.
    pub async fn fetch(&self, owner: &str, repo: &str, days: u32) -> Result<Vec<CommitRecord>> {
        let since = history_cutoff(Utc::now(), days);
        info!("Fetching commits for {owner}/{repo} since {since}...");

        let nodes = self.client.fetch_commit_history(owner, repo, &since).await?;
        let commits = Self::transform_commit_nodes(nodes);

        info!("Fetched {} commits", commits.len());
        Ok(commits)
    }

    fn transform_commit_nodes(nodes: Vec<CommitNode>) -> Vec<CommitRecord> {
        nodes
            .into_iter()
            .map(|node| {
                let (author_name, author_email) = node
                    .author
                    .map(|a| (a.name.unwrap_or_default(), a.email.unwrap_or_default()))
                    .unwrap_or_default();

                CommitRecord {
                    id: node.oid,
                    author_name,
                    author_email,
                    message: node.message,
                    committed_date: node.committed_date,
                    additions: node.additions,
                    deletions: node.deletions,
                    changed_files: node.changed_files,
                }
            })
            .collect()
    }
}

/// `now - days` as an RFC 3339 UTC timestamp, never earlier than the Unix epoch.
pub fn history_cutoff(now: DateTime<Utc>, days: u32) -> String {
    now.checked_sub_signed(Duration::days(i64::from(days)))
        .filter(|cutoff| cutoff.year() >= 1970)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}
