use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommitLensError {
    #[error("Failed to parse input JSON: {0}")]
    InputParse(String),

    #[error("GitHub API request failed: {0}")]
    Fetch(String),

    #[error("Empty response from completion API for commit {commit_id}")]
    EmptyResponse { commit_id: String },

    #[error("Failed to decode analysis for commit {commit_id}: {reason}")]
    MalformedAnalysis { commit_id: String, reason: String },

    #[error("Operation failed: {0}")]
    Operation(String),

    #[error("{0}")]
    InvalidRepository(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, CommitLensError>;
