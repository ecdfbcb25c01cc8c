use futures::{stream, StreamExt};
use log::{debug, info, warn};

use super::client::CompletionClient;
use super::prompt::review_messages;
use crate::error::{CommitLensError, Result};
use crate::models::CommitRecord;
use crate::report::{CommitAnalysis, CommitOutcome, SkippedCommit};

pub struct CommitAnnotator {
    client: CompletionClient,
    concurrency: usize,
}

impl CommitAnnotator {
    /// `concurrency` bounds the completion requests in flight; `1` runs them one by one.
    pub fn new(client: CompletionClient, concurrency: usize) -> Self {
        Self {
            client,
            concurrency: concurrency.max(1),
        }
    }

    /// Analyse every commit independently, yielding one outcome per commit in input order.
    pub async fn annotate(&self, commits: &[CommitRecord]) -> Vec<CommitOutcome> {
        info!(
            "Analyzing {} commits ({} at a time)...",
            commits.len(),
            self.concurrency
        );

        let outcomes: Vec<CommitOutcome> = stream::iter(commits)
            .map(|commit| async move {
                match self.analyze_commit(commit).await {
                    Ok(analysis) => CommitOutcome::Analyzed(analysis),
                    Err(e) => {
                        warn!("Error analyzing commit {}: {e}", commit.id);
                        CommitOutcome::Skipped(SkippedCommit {
                            commit_id: commit.id.clone(),
                            reason: e.to_string(),
                        })
                    }
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let analyzed = outcomes
            .iter()
            .filter(|o| matches!(o, CommitOutcome::Analyzed(_)))
            .count();
        info!("Analyzed {analyzed} of {} commits", commits.len());

        outcomes
    }

    pub async fn analyze_commit(&self, commit: &CommitRecord) -> Result<CommitAnalysis> {
        debug!(
            "Analyzing commit {} by {} <{}> at {}",
            commit.id, commit.author_name, commit.author_email, commit.committed_date
        );

        let content = self
            .client
            .complete(&review_messages(commit))
            .await?
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| CommitLensError::EmptyResponse {
                commit_id: commit.id.clone(),
            })?;

        parse_analysis(&commit.id, &content)
    }
}

/// Decode the model's answer; all of `type`, `quality_score` and `insights` are required.
pub fn parse_analysis(commit_id: &str, content: &str) -> Result<CommitAnalysis> {
    let mut analysis: CommitAnalysis =
        serde_json::from_str(content).map_err(|e| CommitLensError::MalformedAnalysis {
            commit_id: commit_id.to_string(),
            reason: e.to_string(),
        })?;
    analysis.commit_id = commit_id.to_string();
    Ok(analysis)
}
