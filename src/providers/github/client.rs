mod commits;
mod core;
mod operations;

pub use self::commits::CommitNode;
pub use self::core::GitHubClient;
pub use self::operations::{
    Actor, CommitActivityWeek, IssueItem, IssueRequest, IssueUpdateRequest, Notification, PullItem,
    PullRequestRequest, RepositoryRequest, WorkflowRun,
};
