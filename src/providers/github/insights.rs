//! Read-only repository summaries: headline stats and a merged activity timeline.
//!
//! Requests are issued one after another.

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;

use super::client::{Actor, CommitActivityWeek, IssueItem, PullItem, WorkflowRun};
use super::operations::RepoOperationsClient;
use crate::error::Result;

const RECENT_LIMIT: u8 = 5;
const ACTIVITY_LIMIT: u8 = 100;
const ACTIVITY_WEEKS: usize = 12;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepoStats {
    pub stars: u64,
    pub forks: u64,
    pub open_issues: u64,
    pub commit_activity: Vec<WeeklyCommits>,
    pub recent_issues: Vec<IssueSummary>,
    pub recent_workflows: Vec<WorkflowSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyCommits {
    pub week: DateTime<Utc>,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueSummary {
    pub number: u64,
    pub title: String,
    pub body: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowSummary {
    pub name: String,
    pub status: String,
    pub conclusion: String,
    pub started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Issue,
    Pull,
}

/// One issue or pull request in the activity timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEntry {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub actor: String,
    pub action: String,
    pub number: u64,
    pub title: String,
    pub timestamp: DateTime<Utc>,
}

impl RepoOperationsClient {
    /// Stars, forks, open issues, the last weeks of commit activity, and the
    /// most recent issues and workflow runs.
    ///
    /// Commit activity and workflow runs are optional: when GitHub cannot
    /// provide them they come back empty.
    pub async fn repo_stats(&self, owner: &str, repo: &str) -> Result<RepoStats> {
        info!("Fetching stats for {owner}/{repo}...");
        let details = self.client.get_repository(owner, repo).await?;

        let activity = self
            .client
            .commit_activity(owner, repo)
            .await
            .unwrap_or_else(|e| {
                warn!("Commit activity unavailable for {owner}/{repo}: {e}");
                Vec::new()
            });

        let issues = self.client.list_issues(owner, repo, RECENT_LIMIT).await?;

        let runs = self
            .client
            .list_workflow_runs(owner, repo, RECENT_LIMIT)
            .await
            .unwrap_or_else(|e| {
                warn!("Workflow runs unavailable for {owner}/{repo}: {e}");
                Vec::new()
            });

        Ok(RepoStats {
            stars: details.stargazers_count,
            forks: details.forks_count,
            open_issues: details.open_issues_count,
            commit_activity: recent_weeks(activity),
            recent_issues: issues.into_iter().map(IssueSummary::from).collect(),
            recent_workflows: runs.into_iter().map(WorkflowSummary::from).collect(),
        })
    }

    /// Issues and pull requests merged into one timeline, newest first.
    pub async fn repo_activity(&self, owner: &str, repo: &str) -> Result<Vec<ActivityEntry>> {
        info!("Fetching activity for {owner}/{repo}...");
        let issues = self.client.list_issues(owner, repo, ACTIVITY_LIMIT).await?;
        let pulls = self
            .client
            .list_pull_requests(owner, repo, ACTIVITY_LIMIT)
            .await?;

        Ok(merge_activity(issues, pulls))
    }
}

fn recent_weeks(weeks: Vec<CommitActivityWeek>) -> Vec<WeeklyCommits> {
    let skip = weeks.len().saturating_sub(ACTIVITY_WEEKS);
    weeks
        .into_iter()
        .skip(skip)
        .filter_map(|w| {
            DateTime::from_timestamp(w.week, 0).map(|week| WeeklyCommits {
                week,
                count: w.total,
            })
        })
        .collect()
}

fn actor_login(actor: Option<Actor>) -> String {
    actor.map_or_else(|| "unknown".to_string(), |a| a.login)
}

fn merge_activity(issues: Vec<IssueItem>, pulls: Vec<PullItem>) -> Vec<ActivityEntry> {
    let issues = issues
        .into_iter()
        .filter(|issue| issue.pull_request.is_none())
        .map(|issue| ActivityEntry {
            kind: ActivityKind::Issue,
            actor: actor_login(issue.user),
            action: if issue.state == "open" { "opened" } else { "closed" }.to_string(),
            number: issue.number,
            title: issue.title,
            timestamp: issue.created_at,
        });

    let pulls = pulls.into_iter().map(|pull| ActivityEntry {
        kind: ActivityKind::Pull,
        actor: actor_login(pull.user),
        action: if pull.merged_at.is_some() {
            "merged".to_string()
        } else {
            pull.state
        },
        number: pull.number,
        title: pull.title,
        timestamp: pull.created_at,
    });

    let mut entries: Vec<ActivityEntry> = issues.chain(pulls).collect();
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    entries
}

impl From<IssueItem> for IssueSummary {
    fn from(issue: IssueItem) -> Self {
        Self {
            number: issue.number,
            title: issue.title,
            body: issue.body.unwrap_or_default(),
            state: issue.state,
            created_at: issue.created_at,
        }
    }
}

impl From<WorkflowRun> for WorkflowSummary {
    fn from(run: WorkflowRun) -> Self {
        Self {
            name: run.name.unwrap_or_default(),
            status: run.status.unwrap_or_default(),
            conclusion: run.conclusion.unwrap_or_else(|| "pending".to_string()),
            started_at: run.run_started_at,
        }
    }
}
