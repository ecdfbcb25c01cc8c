mod client;
mod commit_fetcher;
mod insights;
mod operations;

pub use commit_fetcher::CommitFetcher;
pub use operations::{OperationOutcome, RepoOperationsClient, Visibility};
