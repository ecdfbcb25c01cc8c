use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::models::CommitRecord;

/// The model's verdict on a single commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitAnalysis {
    #[serde(skip)]
    pub commit_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub quality_score: i64,
    pub insights: String,
}

/// A commit whose analysis failed, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedCommit {
    pub commit_id: String,
    pub reason: String,
}

/// Result of analysing one commit. Failures never abort the run.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    Analyzed(CommitAnalysis),
    Skipped(SkippedCommit),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    pub owner: String,
    pub name: String,
    pub analysis_period_days: u32,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub repository: RepositoryInfo,
    pub commits_analyzed: usize,
    pub analyses: IndexMap<String, CommitAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<Vec<SkippedCommit>>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportBuilder {
    include_skipped: bool,
}

impl ReportBuilder {
    pub fn new(include_skipped: bool) -> Self {
        Self { include_skipped }
    }

    /// Aggregate fetched commits and their outcomes into the final report.
    ///
    /// Outcomes for commits that are not part of `commits` are dropped, so every
    /// key in `analyses` names a fetched commit.
    pub fn build(
        &self,
        repository: RepositoryInfo,
        commits: &[CommitRecord],
        outcomes: Vec<CommitOutcome>,
    ) -> Report {
        let fetched: HashSet<&str> = commits.iter().map(|c| c.id.as_str()).collect();

        let mut analyses = IndexMap::new();
        let mut skipped = Vec::new();

        for outcome in outcomes {
            match outcome {
                CommitOutcome::Analyzed(analysis) => {
                    if fetched.contains(analysis.commit_id.as_str()) {
                        analyses.insert(analysis.commit_id.clone(), analysis);
                    }
                }
                CommitOutcome::Skipped(commit) => {
                    if fetched.contains(commit.commit_id.as_str()) {
                        skipped.push(commit);
                    }
                }
            }
        }

        Report {
            repository,
            commits_analyzed: commits.len(),
            analyses,
            skipped: self.include_skipped.then_some(skipped),
        }
    }
}
