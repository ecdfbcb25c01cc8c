//! Commit analysis pipeline: fetch recent commits, annotate each, build the report.

use std::io::Read;

use log::{info, warn};
use serde::Deserialize;

use crate::config::{AnalysisOptions, CompletionConfig, GitHubConfig};
use crate::error::{CommitLensError, Result};
use crate::providers::github::CommitFetcher;
use crate::providers::openai::{CommitAnnotator, CompletionClient};
use crate::report::{Report, ReportBuilder, RepositoryInfo};

/// The JSON object read from standard input.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnalysisRequest {
    pub owner: String,
    pub repo: String,
    pub days: u32,
}

impl AnalysisRequest {
    /// Read the whole of `reader` and parse it. Unreadable input, including
    /// bytes that are not UTF-8, is an input error like malformed JSON.
    pub fn from_reader(mut reader: impl Read) -> Result<Self> {
        let mut raw = String::new();
        reader
            .read_to_string(&mut raw)
            .map_err(|e| CommitLensError::InputParse(format!("Failed to read input: {e}")))?;

        Self::from_json(&raw)
    }

    pub fn from_json(input: &str) -> Result<Self> {
        let request: Self = serde_json::from_str(input)
            .map_err(|e| CommitLensError::InputParse(e.to_string()))?;

        if request.owner.trim().is_empty() {
            return Err(CommitLensError::InputParse("'owner' must not be empty".to_string()));
        }
        if request.repo.trim().is_empty() {
            return Err(CommitLensError::InputParse("'repo' must not be empty".to_string()));
        }
        if request.days == 0 {
            return Err(CommitLensError::InputParse(
                "'days' must be a positive integer".to_string(),
            ));
        }

        Ok(request)
    }
}

pub struct AnalysisPipeline {
    fetcher: CommitFetcher,
    annotator: CommitAnnotator,
    builder: ReportBuilder,
}

impl AnalysisPipeline {
    pub fn new(
        github: &GitHubConfig,
        completion: &CompletionConfig,
        options: AnalysisOptions,
    ) -> Result<Self> {
        if github.token.is_none() {
            warn!("No GitHub token configured; the GraphQL API will reject the query");
        }

        Ok(Self {
            fetcher: CommitFetcher::new(github)?,
            annotator: CommitAnnotator::new(CompletionClient::new(completion)?, options.concurrency),
            builder: ReportBuilder::new(options.include_skipped),
        })
    }

    /// Run the pipeline. A fetch failure aborts the run; per-commit failures only
    /// leave that commit out of `analyses`.
    pub async fn run(&self, request: &AnalysisRequest) -> Result<Report> {
        info!(
            "Starting commit analysis for {}/{} over {} days",
            request.owner, request.repo, request.days
        );

        let commits = self
            .fetcher
            .fetch(&request.owner, &request.repo, request.days)
            .await?;
        let outcomes = self.annotator.annotate(&commits).await;

        let repository = RepositoryInfo {
            owner: request.owner.clone(),
            name: request.repo.clone(),
            analysis_period_days: request.days,
        };

        Ok(self.builder.build(repository, &commits, outcomes))
    }
}
